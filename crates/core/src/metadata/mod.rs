//! Site metadata: the data model and the layered resolver that builds it.

mod merge;
mod types;

pub use merge::{decode_url, merge_layers};
pub use types::*;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata layer '{0}' must be an object")]
    InvalidLayer(&'static str),

    #[error("Unknown schema: {0}")]
    UnknownSchema(String),

    #[error("Site definition has no id")]
    MissingId,

    #[error("Invalid site metadata: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Builds the effective [`SiteMetadata`] from schema, site and user layers.
#[derive(Debug, Clone)]
pub struct MetadataResolver<'a> {
    schema_defaults: &'a Value,
    default_timezone: Option<&'a str>,
}

impl<'a> MetadataResolver<'a> {
    pub fn new(schema_defaults: &'a Value) -> Self {
        Self {
            schema_defaults,
            default_timezone: None,
        }
    }

    pub fn with_default_timezone(mut self, offset: Option<&'a str>) -> Self {
        self.default_timezone = offset;
        self
    }

    pub fn resolve(
        &self,
        site: &Value,
        user: Option<&Value>,
    ) -> Result<SiteMetadata, MetadataError> {
        if !self.schema_defaults.is_object() {
            return Err(MetadataError::InvalidLayer("schema"));
        }
        if !site.is_object() {
            return Err(MetadataError::InvalidLayer("site"));
        }

        let mut layers = vec![site];
        if let Some(user) = user {
            if !user.is_object() {
                return Err(MetadataError::InvalidLayer("user"));
            }
            layers.push(user);
        }

        let mut merged = merge_layers(self.schema_defaults.clone(), &layers);
        self.post_merge(&mut merged);

        if merged.get("id").and_then(Value::as_str).is_none_or(str::is_empty) {
            return Err(MetadataError::MissingId);
        }

        let metadata: SiteMetadata = serde_json::from_value(merged)?;
        debug!(
            site = %metadata.id,
            schema = %metadata.schema,
            allow_search = metadata.allow_search(),
            "Resolved site metadata"
        );
        Ok(metadata)
    }

    fn post_merge(&self, merged: &mut Value) {
        let Some(obj) = merged.as_object_mut() else {
            return;
        };

        for key in ["urls", "legacyUrls"] {
            if let Some(Value::Array(urls)) = obj.get_mut(key) {
                for url in urls.iter_mut() {
                    if let Value::String(s) = url {
                        *s = decode_url(s);
                    }
                }
                dedup_in_order(urls);
            }
        }

        let has_search = obj.get("search").is_some_and(Value::is_object);
        let has_user_info = obj.get("userInfo").is_some_and(Value::is_object);
        obj.entry("isOffline").or_insert(json!(false));
        obj.entry("allowSearch").or_insert(json!(has_search));
        obj.entry("allowQueryUserInfo").or_insert(json!(has_user_info));
        if let Some(tz) = self.default_timezone {
            obj.entry("timezoneOffset").or_insert(json!(tz));
        }

        let categories = match obj.get("category") {
            Some(Value::Array(defs)) if !defs.is_empty() => defs.clone(),
            _ => return,
        };
        if let Some(Value::Object(search)) = obj.get_mut("search") {
            let existing = match search.remove("categories") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            let mut spliced = categories;
            spliced.extend(existing);
            search.insert("categories".to_string(), Value::Array(dedup_by_key(spliced)));
        }
    }
}

fn dedup_in_order(items: &mut Vec<Value>) {
    let mut seen = Vec::new();
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(item.clone());
            true
        }
    });
}

fn category_key(item: &Value) -> Option<&str> {
    item.get("key").and_then(Value::as_str)
}

/// Keep the first category definition for every key.
fn dedup_by_key(items: Vec<Value>) -> Vec<Value> {
    let mut keys: Vec<String> = Vec::new();
    items
        .into_iter()
        .filter(|item| match category_key(item) {
            Some(key) if keys.iter().any(|k| k == key) => false,
            Some(key) => {
                keys.push(key.to_string());
                true
            }
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Value {
        json!({
            "schema": "common",
            "search": {
                "requestConfig": { "url": "/search" },
                "selectors": {
                    "title": { "selector": "a.title" },
                    "size": { "selector": "td.size", "filters": ["f1"] }
                }
            },
            "tags": ["a"]
        })
    }

    #[test]
    fn test_resolve_merges_three_layers() {
        let site = json!({
            "id": "demo",
            "name": "Demo",
            "urls": ["uggcf://qrzb.rknzcyr/"],
            "tags": ["b"],
            "search": { "selectors": { "size": { "filters": ["f2"] } } }
        });
        let user = json!({ "urls": ["https://mirror.example/"] });

        let schema = schema();
        let metadata = MetadataResolver::new(&schema)
            .resolve(&site, Some(&user))
            .unwrap();

        assert_eq!(metadata.tags, vec!["b", "a"]);
        assert_eq!(
            metadata.urls,
            vec!["https://mirror.example/", "https://demo.example/"]
        );
        let selectors = metadata.search.unwrap().selectors.unwrap();
        assert_eq!(selectors.fields["size"].filters.len(), 1);
        assert_eq!(selectors.fields["size"].filters[0].name, "f2");
        assert_eq!(selectors.fields["size"].selector, vec!["td.size"]);
    }

    #[test]
    fn test_resolve_defaults_from_blocks() {
        let schema = schema();
        let metadata = MetadataResolver::new(&schema)
            .with_default_timezone(Some("+0800"))
            .resolve(&json!({"id": "demo", "urls": ["https://demo/"]}), None)
            .unwrap();

        assert!(metadata.allow_search());
        assert!(!metadata.allow_query_user_info());
        assert_eq!(metadata.timezone_offset.as_deref(), Some("+0800"));
    }

    #[test]
    fn test_resolve_keeps_explicit_flags() {
        let schema = schema();
        let metadata = MetadataResolver::new(&schema)
            .resolve(&json!({"id": "demo", "allowSearch": false, "isOffline": true}), None)
            .unwrap();
        assert_eq!(metadata.allow_search, Some(false));
        assert!(metadata.is_offline);
    }

    #[test]
    fn test_categories_spliced_first() {
        let schema = json!({ "search": { "categories": [{"name": "Existing", "key": "sort"}] } });
        let site = json!({
            "id": "demo",
            "category": [{
                "name": "Category",
                "key": "cat",
                "options": [{"name": "Movies", "value": 401}]
            }]
        });
        let metadata = MetadataResolver::new(&schema).resolve(&site, None).unwrap();
        let categories = metadata.search.unwrap().categories;
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].key, "cat");
        assert_eq!(categories[1].key, "sort");
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let schema = schema();
        let err = MetadataResolver::new(&schema)
            .resolve(&json!({"name": "nameless"}), None)
            .unwrap_err();
        assert!(matches!(err, MetadataError::MissingId));
    }

    #[test]
    fn test_non_object_layer_is_rejected() {
        let schema = schema();
        let err = MetadataResolver::new(&schema)
            .resolve(&json!(["not", "an", "object"]), None)
            .unwrap_err();
        assert!(matches!(err, MetadataError::InvalidLayer("site")));
    }
}
