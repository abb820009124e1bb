//! Layered merge of schema defaults, site definition and user overrides.

use serde_json::{Map, Value};

/// Keys whose value is taken wholesale from the most specific layer.
const REPLACE_KEYS: &[&str] = &["filters", "switchFilters", "process", "levelRequirements"];

/// Keys that accept `"x"` as shorthand for `["x"]` and therefore merge as lists.
const LIST_KEYS: &[&str] = &["selector", "urlPattern", "header"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Objects merge recursively, scalars are overwritten.
    Deep,
    /// Arrays concatenate with the more specific layer first.
    Prepend,
    Replace,
}

fn strategy_for(key: &str) -> Strategy {
    if REPLACE_KEYS.contains(&key) {
        Strategy::Replace
    } else if LIST_KEYS.contains(&key) {
        Strategy::Prepend
    } else {
        Strategy::Deep
    }
}

/// Merge `overrides` onto `base`, each layer more specific than the last.
///
/// `null` in a more specific layer never removes a value from a lower one.
pub fn merge_layers(base: Value, overrides: &[&Value]) -> Value {
    overrides
        .iter()
        .fold(base, |acc, layer| merge_value(acc, (*layer).clone(), Strategy::Deep))
}

fn merge_value(lower: Value, upper: Value, strategy: Strategy) -> Value {
    if upper.is_null() {
        return lower;
    }
    if strategy == Strategy::Replace {
        return upper;
    }

    match (lower, upper) {
        (Value::Object(lower), Value::Object(upper)) => Value::Object(merge_objects(lower, upper)),
        (Value::Array(lower), Value::Array(upper)) => concat(upper, lower),
        (lower, upper) if strategy == Strategy::Prepend => {
            concat(into_list(upper), into_list(lower))
        }
        (_, upper) => upper,
    }
}

fn merge_objects(mut lower: Map<String, Value>, upper: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in upper {
        let strategy = strategy_for(&key);
        let merged = match lower.remove(&key) {
            Some(existing) => merge_value(existing, value, strategy),
            None if value.is_null() => continue,
            None => value,
        };
        lower.insert(key, merged);
    }
    lower
}

fn into_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn concat(mut first: Vec<Value>, second: Vec<Value>) -> Value {
    first.extend(second);
    Value::Array(first)
}

/// Reverse the ROT13 obfuscation some definitions apply to their URLs.
///
/// Obfuscated URLs are recognised by their encoded scheme (`uggc`).
pub fn decode_url(url: &str) -> String {
    if !url.starts_with("uggc") {
        return url.to_string();
    }
    url.chars()
        .map(|c| match c {
            'a'..='z' => (((c as u8 - b'a') + 13) % 26 + b'a') as char,
            'A'..='Z' => (((c as u8 - b'A') + 13) % 26 + b'A') as char,
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arrays_prepend_more_specific_layer() {
        let merged = merge_layers(json!({"tags": ["a"]}), &[&json!({"tags": ["b"]})]);
        assert_eq!(merged["tags"], json!(["b", "a"]));
    }

    #[test]
    fn test_filters_replaced_wholesale() {
        let schema = json!({"size": {"selector": "td.size", "filters": ["f1"]}});
        let site = json!({"size": {"filters": ["f2"]}});
        let merged = merge_layers(schema, &[&site]);
        assert_eq!(merged["size"]["filters"], json!(["f2"]));
        assert_eq!(merged["size"]["selector"], json!("td.size"));
    }

    #[test]
    fn test_switch_filters_replaced_wholesale() {
        let schema = json!({"f": {"switchFilters": {"a": ["x"], "b": ["y"]}}});
        let site = json!({"f": {"switchFilters": {"c": ["z"]}}});
        let merged = merge_layers(schema, &[&site]);
        assert_eq!(merged["f"]["switchFilters"], json!({"c": ["z"]}));
    }

    #[test]
    fn test_selector_shorthand_concatenates() {
        let schema = json!({"title": {"selector": "a.title"}});
        let site = json!({"title": {"selector": ["h1"]}});
        let merged = merge_layers(schema, &[&site]);
        assert_eq!(merged["title"]["selector"], json!(["h1", "a.title"]));
    }

    #[test]
    fn test_scalars_later_layer_wins_and_null_is_ignored() {
        let merged = merge_layers(
            json!({"name": "schema", "timezoneOffset": "+0800"}),
            &[&json!({"name": "site", "timezoneOffset": null}), &json!({"name": "user"})],
        );
        assert_eq!(merged["name"], json!("user"));
        assert_eq!(merged["timezoneOffset"], json!("+0800"));
    }

    #[test]
    fn test_three_layer_array_order() {
        let merged = merge_layers(
            json!({"urls": ["https://schema/"]}),
            &[&json!({"urls": ["https://site/"]}), &json!({"urls": ["https://mirror/"]})],
        );
        assert_eq!(
            merged["urls"],
            json!(["https://mirror/", "https://site/", "https://schema/"])
        );
    }

    #[test]
    fn test_process_steps_replaced_wholesale() {
        let merged = merge_layers(
            json!({"userInfo": {"pickLast": ["id"], "process": [{"fields": ["id"]}]}}),
            &[&json!({"userInfo": {"process": [{"fields": ["bonus"]}]}})],
        );
        assert_eq!(merged["userInfo"]["process"], json!([{"fields": ["bonus"]}]));
        assert_eq!(merged["userInfo"]["pickLast"], json!(["id"]));
    }

    #[test]
    fn test_decode_url() {
        assert_eq!(decode_url("uggcf://rknzcyr.bet/"), "https://example.org/");
        assert_eq!(decode_url("https://plain.example/"), "https://plain.example/");
    }
}
