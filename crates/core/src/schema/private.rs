use serde_json::{json, Value};

use super::{CommonSchema, Schema};
use crate::metadata::merge_layers;

/// Private trackers: account data is worth collecting and the list view
/// may only link to a detail page.
pub struct PrivateSchema;

impl PrivateSchema {
    pub(crate) fn layer() -> Value {
        json!({
            "schema": "private",
            "type": "private",
            "userInfo": {
                "pickLast": ["id", "name", "joinTime"]
            },
            "detail": {
                "selectors": {
                    "link": {
                        "selector": ["a[href*='download.php']", "a[href*='/download/']"],
                        "attr": "href"
                    }
                }
            }
        })
    }
}

impl Schema for PrivateSchema {
    fn name(&self) -> &'static str {
        "private"
    }

    fn defaults(&self) -> Value {
        merge_layers(CommonSchema.defaults(), &[&Self::layer()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_keeps_common_search() {
        let defaults = PrivateSchema.defaults();
        assert_eq!(defaults["type"], "private");
        assert_eq!(defaults["schema"], "private");
        assert_eq!(defaults["search"]["keywordPath"], "params.keywords");
        assert_eq!(defaults["userInfo"]["pickLast"][0], "id");
    }
}
