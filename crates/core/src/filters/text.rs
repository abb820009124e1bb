//! String utilities and URL query extraction.

use regex_lite::Regex;
use serde_json::Value;
use tracing::warn;
use url::Url;

use super::as_text;

/// Return the first query parameter of `url` whose name appears in
/// `names`, trying names in order. Relative URLs are accepted.
pub fn querystring(url: &str, names: &[&str]) -> Option<String> {
    let parsed = Url::parse(url).or_else(|_| {
        Url::parse("http://localhost/").and_then(|base| base.join(url))
    });
    let parsed = parsed.ok()?;

    names.iter().find_map(|name| {
        parsed
            .query_pairs()
            .find(|(key, _)| key == *name)
            .map(|(_, value)| value.into_owned())
    })
}

fn string_args(args: &[Value]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| match arg {
            Value::Array(items) => items.iter().map(as_text).collect::<Vec<_>>(),
            other => vec![as_text(other)],
        })
        .collect()
}

pub(super) fn querystring_value(value: Value, args: &[Value]) -> Value {
    let mut names = string_args(args);
    if names.is_empty() {
        names.push("id".to_string());
    }
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    Value::String(querystring(&as_text(&value), &names).unwrap_or_default())
}

pub(super) fn map_str(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

pub(super) fn append(value: Value, args: &[Value]) -> Value {
    let suffix = args.first().map(as_text).unwrap_or_default();
    Value::String(format!("{}{}", as_text(&value), suffix))
}

pub(super) fn prepend(value: Value, args: &[Value]) -> Value {
    let prefix = args.first().map(as_text).unwrap_or_default();
    Value::String(format!("{}{}", prefix, as_text(&value)))
}

pub(super) fn replace(value: Value, args: &[Value]) -> Value {
    let (Some(from), to) = (args.first().map(as_text), args.get(1).map(as_text)) else {
        return value;
    };
    if from.is_empty() {
        return value;
    }
    Value::String(as_text(&value).replace(&from, &to.unwrap_or_default()))
}

pub(super) fn url_encode(value: Value, _args: &[Value]) -> Value {
    Value::String(urlencoding::encode(&as_text(&value)).into_owned())
}

/// Invalid escapes leave the value untouched.
pub(super) fn url_decode(value: Value, _args: &[Value]) -> Value {
    let text = as_text(&value);
    match urlencoding::decode(&text) {
        Ok(decoded) => Value::String(decoded.into_owned()),
        Err(_) => Value::String(text),
    }
}

/// `split(separator, index)`; a negative index counts from the end.
pub(super) fn split(value: Value, args: &[Value]) -> Value {
    let separator = args.first().map(as_text).unwrap_or_else(|| " ".to_string());
    let index = args.get(1).and_then(Value::as_i64).unwrap_or(0);
    let text = as_text(&value);
    let parts: Vec<&str> = text.split(separator.as_str()).collect();

    let position = if index < 0 {
        parts.len().checked_sub(index.unsigned_abs() as usize)
    } else {
        Some(index as usize)
    };
    let part = position.and_then(|i| parts.get(i)).copied().unwrap_or("");
    Value::String(part.to_string())
}

pub(super) fn trim(value: Value, args: &[Value]) -> Value {
    let text = as_text(&value);
    match args.first().map(as_text) {
        Some(chars) if !chars.is_empty() => {
            Value::String(text.trim_matches(|c| chars.contains(c)).to_string())
        }
        _ => Value::String(text.trim().to_string()),
    }
}

/// `regex(pattern, group)`; yields `""` when the pattern does not match.
pub(super) fn regex_capture(value: Value, args: &[Value]) -> Value {
    let Some(pattern) = args.first().map(as_text) else {
        return value;
    };
    let group = args.get(1).and_then(Value::as_u64).unwrap_or(1) as usize;
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Invalid regex filter pattern");
            return value;
        }
    };

    let text = as_text(&value);
    let captured = re
        .captures(&text)
        .and_then(|caps| caps.get(group).or_else(|| caps.get(0)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    Value::String(captured)
}
