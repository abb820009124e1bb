//! Lenient conversions from resolved field values.

use serde_json::Value;

use crate::filters::parse_number;

/// Non-empty trimmed text.
pub fn as_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().chars().any(|c| c.is_ascii_digit()) => Some(parse_number(s)),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        other => as_f64(other).map(|f| f.round() as i64),
    }
}

/// Epoch milliseconds: a JSON number or a string holding only an integer.
/// Date text a filter could not parse yields `None`.
pub fn as_epoch_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_u64(value: &Value) -> Option<u64> {
    as_f64(value).filter(|f| *f >= 0.0).map(|f| f.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_string() {
        assert_eq!(as_string(&json!(" a ")), Some("a".into()));
        assert_eq!(as_string(&json!(7)), Some("7".into()));
        assert_eq!(as_string(&json!("")), None);
        assert_eq!(as_string(&json!(null)), None);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(as_i64(&json!("1,234")), Some(1234));
        assert_eq!(as_i64(&json!("n/a")), None);
        assert_eq!(as_u64(&json!(-3)), None);
        assert_eq!(as_f64(&json!("2.5")), Some(2.5));
    }

    #[test]
    fn test_epoch_millis_rejects_date_text() {
        assert_eq!(as_epoch_millis(&json!(1_704_153_600_000i64)), Some(1_704_153_600_000));
        assert_eq!(as_epoch_millis(&json!(" 1704153600000 ")), Some(1_704_153_600_000));
        assert_eq!(as_epoch_millis(&json!("2024年01月02日")), None);
        assert_eq!(as_epoch_millis(&json!("2024-01-02")), None);
        assert_eq!(as_epoch_millis(&json!(null)), None);
    }
}
