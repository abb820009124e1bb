//! Dotted/bracketed path access over `serde_json::Value`.
//!
//! Paths look like `params.keywords`, `response.results[0].torrents` or
//! `data['search-term']`. They are used both to read fields out of JSON
//! responses and to write keywords/assertion values into request configs.

use serde_json::{Map, Value};

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

fn parse(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c);
                }
                let inner = inner.trim();
                let quoted = inner.len() >= 2
                    && ((inner.starts_with('\'') && inner.ends_with('\''))
                        || (inner.starts_with('"') && inner.ends_with('"')));
                if quoted {
                    segments.push(Segment::Key(inner[1..inner.len() - 1].to_string()));
                } else if let Ok(index) = inner.parse::<usize>() {
                    segments.push(Segment::Index(index));
                } else if !inner.is_empty() {
                    segments.push(Segment::Key(inner.to_string()));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        segments.push(Segment::Key(current));
    }
    segments
}

/// Read the value at `path`. An empty path returns the root.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    parse(path).iter().try_fold(root, |node, segment| match segment {
        Segment::Key(key) => match node {
            Value::Object(map) => map.get(key),
            // numeric keys are allowed on arrays: `rows.0.title`
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        },
        Segment::Index(index) => node.as_array().and_then(|items| items.get(*index)),
    })
}

/// Whether a non-null value exists at `path`.
pub fn has(root: &Value, path: &str) -> bool {
    get(root, path).is_some_and(|v| !v.is_null())
}

/// Write `value` at `path`, creating intermediate objects/arrays as needed.
///
/// Scalars found along the way are replaced by containers.
pub fn set(root: &mut Value, path: &str, value: Value) {
    let segments = parse(path);
    if segments.is_empty() {
        *root = value;
        return;
    }

    let mut node = root;
    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        node = match segment {
            Segment::Key(key) => {
                if !node.is_object() {
                    *node = Value::Object(Map::new());
                }
                let Value::Object(map) = node else {
                    return;
                };
                if last {
                    map.insert(key.clone(), value);
                    return;
                }
                map.entry(key.clone()).or_insert(Value::Null)
            }
            Segment::Index(index) => {
                if !node.is_array() {
                    *node = Value::Array(Vec::new());
                }
                let Value::Array(items) = node else {
                    return;
                };
                if items.len() <= *index {
                    items.resize(*index + 1, Value::Null);
                }
                if last {
                    items[*index] = value;
                    return;
                }
                &mut items[*index]
            }
        };
    }
}

/// Remove and return the value at `path`.
pub fn remove(root: &mut Value, path: &str) -> Option<Value> {
    let mut segments = parse(path);
    let last = segments.pop()?;

    let mut node = root;
    for segment in &segments {
        node = match segment {
            Segment::Key(key) => node.as_object_mut()?.get_mut(key)?,
            Segment::Index(index) => node.as_array_mut()?.get_mut(*index)?,
        };
    }

    match last {
        Segment::Key(key) => node.as_object_mut()?.remove(&key),
        Segment::Index(index) => {
            let items = node.as_array_mut()?;
            (index < items.len()).then(|| items.remove(index))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_dotted_and_bracketed() {
        let value = json!({
            "response": { "results": [ { "groupName": "Album" } ] },
            "odd-key": { "x": 1 }
        });
        assert_eq!(
            get(&value, "response.results[0].groupName"),
            Some(&json!("Album"))
        );
        assert_eq!(get(&value, "response.results.0.groupName"), Some(&json!("Album")));
        assert_eq!(get(&value, "['odd-key'].x"), Some(&json!(1)));
        assert_eq!(get(&value, "response.missing"), None);
        assert_eq!(get(&value, ""), Some(&value));
    }

    #[test]
    fn test_set_creates_intermediate_nodes() {
        let mut value = json!({});
        set(&mut value, "params.keywords", json!("ubuntu"));
        set(&mut value, "data.list[1]", json!(true));
        assert_eq!(value["params"]["keywords"], "ubuntu");
        assert_eq!(value["data"]["list"], json!([null, true]));
    }

    #[test]
    fn test_set_replaces_scalar_parent() {
        let mut value = json!({ "params": "oops" });
        set(&mut value, "params.id", json!(7));
        assert_eq!(value, json!({ "params": { "id": 7 } }));
    }

    #[test]
    fn test_has_ignores_null() {
        let value = json!({ "a": null, "b": 0 });
        assert!(!has(&value, "a"));
        assert!(has(&value, "b"));
        assert!(!has(&value, "c"));
    }

    #[test]
    fn test_remove() {
        let mut value = json!({ "params": { "search": "x", "keep": 1 } });
        assert_eq!(remove(&mut value, "params.search"), Some(json!("x")));
        assert_eq!(value, json!({ "params": { "keep": 1 } }));
        assert_eq!(remove(&mut value, "params.search"), None);
    }
}
