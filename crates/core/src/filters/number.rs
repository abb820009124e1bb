//! Size and number parsing.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::Value;

use super::{as_text, number_value};

static SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?|\.\d+)\s*([KMGTPEZY]i?B|B(?:ytes?)?)?")
        .expect("size regex is valid")
});

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?(?:\d+(?:\.\d+)?|\.\d+)").expect("number regex is valid"));

const UNIT_PREFIXES: &str = "KMGTPEZY";

/// Parse a human-readable size into bytes.
///
/// Decimal and binary unit spellings are both treated as powers of 1024
/// (`1 KB == 1 KiB == 1024`). A number without a unit is taken as bytes.
/// Returns `0.0` when nothing size-like is found.
pub fn parse_size(input: &str) -> f64 {
    let cleaned = input.replace(',', "");
    let Some(caps) = SIZE_RE.captures(&cleaned) else {
        return 0.0;
    };
    let Ok(number) = caps[1].parse::<f64>() else {
        return 0.0;
    };

    let exponent = caps
        .get(2)
        .and_then(|unit| unit.as_str().chars().next())
        .map(|c| c.to_ascii_uppercase())
        .and_then(|c| UNIT_PREFIXES.find(c))
        .map(|i| i as i32 + 1)
        .unwrap_or(0);

    number * 1024f64.powi(exponent)
}

/// Parse the first decimal number in `input`, ignoring thousands
/// separators and whitespace. Returns `0.0` when there is none.
pub fn parse_number(input: &str) -> f64 {
    let cleaned: String = input
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    NUMBER_RE
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

pub(super) fn parse_size_value(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        other => number_value(parse_size(&as_text(other))),
    }
}

pub(super) fn parse_number_value(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        other => number_value(parse_number(&as_text(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_binary_units() {
        assert_eq!(parse_size("1.5 GiB"), 1.5 * 2f64.powi(30));
        assert_eq!(parse_size("1.5GB"), 1.5 * 2f64.powi(30));
        assert_eq!(parse_size("700 mb"), 700.0 * 2f64.powi(20));
        assert_eq!(parse_size("2 KiB"), 2048.0);
        assert_eq!(parse_size("1 ZiB"), 2f64.powi(70));
        assert_eq!(parse_size("512 B"), 512.0);
    }

    #[test]
    fn test_parse_size_with_separators() {
        assert_eq!(parse_size("1,024.00 MB"), 1024.0 * 2f64.powi(20));
    }

    #[test]
    fn test_parse_size_no_match() {
        assert_eq!(parse_size("bogus"), 0.0);
        assert_eq!(parse_size(""), 0.0);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1,234"), 1234.0);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("Seeders: 1 234"), 1234.0);
        assert_eq!(parse_number("ratio 2.75x"), 2.75);
        assert_eq!(parse_number("-3"), -3.0);
    }

    #[test]
    fn test_value_wrappers_keep_numbers() {
        assert_eq!(parse_size_value(&Value::from(42)), Value::from(42));
        assert_eq!(parse_number_value(&Value::from("12")), Value::from(12));
        assert_eq!(parse_size_value(&Value::Null), Value::from(0));
    }
}
