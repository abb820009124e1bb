//! Absolute and relative time parsing. All results are epoch milliseconds.

use chrono::{
    DateTime, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::Value;

use super::{as_text, number_value};

/// Patterns tried in order when a `parseTime` call gives none.
pub const DEFAULT_TIME_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%b %d %Y, %H:%M",
    "%d %b %Y, %H:%M",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
];

static TTL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*([^\d\s.,:;]+)").expect("ttl regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq)]
enum TtlUnit {
    Months(u32),
    Millis(i64),
}

fn ttl_unit(token: &str) -> Option<TtlUnit> {
    const SECOND: i64 = 1000;
    const MINUTE: i64 = 60 * SECOND;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    let lower = token.to_lowercase();
    let unit_name = lower
        .strip_suffix("ago")
        .or_else(|| lower.strip_suffix('前'))
        .unwrap_or(lower.as_str());

    let unit = match unit_name {
        "y" | "yr" | "yrs" | "year" | "years" | "年" => TtlUnit::Months(12),
        "q" | "quarter" | "quarters" | "季" | "季度" => TtlUnit::Months(3),
        "mo" | "mon" | "mos" | "month" | "months" | "月" | "个月" | "個月" => TtlUnit::Months(1),
        "w" | "wk" | "wks" | "week" | "weeks" | "周" | "週" | "星期" => TtlUnit::Millis(7 * DAY),
        "d" | "day" | "days" | "天" | "日" => TtlUnit::Millis(DAY),
        "h" | "hr" | "hrs" | "hour" | "hours" | "时" | "小时" | "時" | "小時" => {
            TtlUnit::Millis(HOUR)
        }
        "m" | "min" | "mins" | "minute" | "minutes" | "分" | "分钟" | "分鐘" => {
            TtlUnit::Millis(MINUTE)
        }
        "s" | "sec" | "secs" | "second" | "seconds" | "秒" => TtlUnit::Millis(SECOND),
        _ => return None,
    };
    Some(unit)
}

/// Subtract a human-readable duration ("1 year 2 months", "3d 4h",
/// "5分钟前") from `now`. Unknown units contribute nothing; a duration
/// reaching past the representable range gives 0.
pub fn parse_ttl_at(input: &str, now: DateTime<Utc>) -> i64 {
    let mut months = 0f64;
    let mut millis = 0f64;

    for caps in TTL_RE.captures_iter(input) {
        let Ok(amount) = caps[1].parse::<f64>() else {
            continue;
        };
        match ttl_unit(&caps[2]) {
            Some(TtlUnit::Months(n)) => months += amount * n as f64,
            Some(TtlUnit::Millis(n)) => millis += amount * n as f64,
            None => {}
        }
    }

    let whole_months = months.trunc() as u32;
    // fractional months are approximated as 30 days
    millis += months.fract() * 30.0 * 86_400_000.0;

    let Some(shifted) = now.checked_sub_months(Months::new(whole_months)) else {
        return 0;
    };
    Duration::try_milliseconds(millis as i64)
        .and_then(|delta| shifted.checked_sub_signed(delta))
        .map_or(0, |dt| dt.timestamp_millis())
}

pub fn parse_ttl(input: &str) -> i64 {
    parse_ttl_at(input, Utc::now())
}

static OFFSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:UTC|GMT)?\s*([+-])(\d{1,2}):?(\d{2})?$").expect("offset regex is valid")
});

/// Parse a fixed UTC offset such as `+0800`, `+08:00`, `-5` or `UTC+8`.
pub fn parse_offset(input: &str) -> Option<FixedOffset> {
    let caps = OFFSET_RE.captures(input.trim())?;
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps.get(3).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
    let seconds = hours * 3600 + minutes * 60;
    if &caps[1] == "-" {
        FixedOffset::west_opt(seconds)
    } else {
        FixedOffset::east_opt(seconds)
    }
}

/// Try `patterns` in order against `input`; the first valid one wins.
///
/// RFC 3339 timestamps are always accepted. Naive timestamps are read as UTC.
pub fn parse_time(input: &str, patterns: &[&str]) -> Option<i64> {
    parse_time_in(input, patterns, Utc.fix())
}

/// Like [`parse_time`], reading naive timestamps in `offset`.
pub fn parse_time_in(input: &str, patterns: &[&str], offset: FixedOffset) -> Option<i64> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp_millis());
    }

    patterns.iter().find_map(|pattern| {
        let naive = NaiveDateTime::parse_from_str(input, pattern).ok().or_else(|| {
            NaiveDate::parse_from_str(input, pattern)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
        offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.timestamp_millis())
    })
}

pub(super) fn parse_ttl_value(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        other => Value::from(parse_ttl(&as_text(other))),
    }
}

/// `parseTime(patterns...)`. Epoch numbers below 10^11 are taken as seconds.
pub(super) fn parse_time_value(value: Value, args: &[Value]) -> Value {
    parse_time_value_in(value, args, Utc.fix())
}

/// `parseTime` for a site whose pages show local times at `offset`.
pub fn parse_time_filter(offset: FixedOffset) -> super::FilterFn {
    std::sync::Arc::new(move |value: Value, args: &[Value]| {
        parse_time_value_in(value, args, offset)
    })
}

fn parse_time_value_in(value: Value, args: &[Value], offset: FixedOffset) -> Value {
    if let Some(n) = value.as_f64() {
        return if n.abs() < 1e11 {
            number_value(n * 1000.0)
        } else {
            value
        };
    }

    let custom: Vec<String> = args
        .iter()
        .flat_map(|arg| match arg {
            Value::Array(items) => items.iter().map(as_text).collect::<Vec<_>>(),
            other => vec![as_text(other)],
        })
        .collect();
    let patterns: Vec<&str> = if custom.is_empty() {
        DEFAULT_TIME_PATTERNS.to_vec()
    } else {
        custom.iter().map(String::as_str).collect()
    };

    match parse_time_in(&as_text(&value), &patterns, offset) {
        Some(ms) => Value::from(ms),
        None => value,
    }
}
