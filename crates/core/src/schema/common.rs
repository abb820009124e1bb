use serde_json::{json, Value};

use super::Schema;

/// Plain public trackers: a document search page queried with
/// `?keywords=`.
pub struct CommonSchema;

impl Schema for CommonSchema {
    fn name(&self) -> &'static str {
        "common"
    }

    fn defaults(&self) -> Value {
        json!({
            "schema": "common",
            "type": "public",
            "search": {
                "keywordPath": "params.keywords",
                "requestConfig": {
                    "url": "/",
                    "method": "get",
                    "responseType": "document"
                },
                "selectors": {
                    "time": { "filters": ["parseTime"] },
                    "size": { "filters": ["parseSize"] }
                }
            }
        })
    }
}
