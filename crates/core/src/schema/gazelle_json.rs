use async_trait::async_trait;
use serde_json::{json, Value};

use super::{PrivateSchema, Schema};
use crate::field::Source;
use crate::metadata::merge_layers;
use crate::path;
use crate::site::{default_login_check, AuthorizeContext, RequestAuthorizer, SiteError, SiteHooks};
use crate::transport::Response;

/// Gazelle sites queried through the `ajax.php` JSON API.
pub struct GazelleJsonSchema;

/// Sends the `apikey` user input as the `Authorization` header.
///
/// Sites without a configured key fall back to session cookies.
pub struct ApiKeyAuthorizer {
    input: &'static str,
}

impl ApiKeyAuthorizer {
    pub fn new(input: &'static str) -> Self {
        Self { input }
    }
}

#[async_trait]
impl RequestAuthorizer for ApiKeyAuthorizer {
    async fn authorize(
        &self,
        ctx: &AuthorizeContext<'_>,
        request: &mut Value,
    ) -> Result<(), SiteError> {
        let Some(key) = ctx.metadata.user_input.get(self.input) else {
            return Ok(());
        };
        if !path::has(request, "headers.Authorization") {
            path::set(request, "headers.Authorization", Value::String(key.clone()));
        }
        Ok(())
    }
}

/// `"FLAC / Lossless / CD"` style edition line of a variant.
fn edition(source: Source<'_>) -> Value {
    let Some(torrent) = source.as_json() else {
        return Value::Null;
    };
    let parts: Vec<String> = ["format", "encoding", "media", "remasterTitle"]
        .iter()
        .filter_map(|key| torrent.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Value::String(parts.join(" / "))
}

/// The API answers 200 with `{"status": "failure"}` for bad sessions.
fn api_logged_in(response: &Response, metadata: &crate::metadata::SiteMetadata) -> bool {
    if !default_login_check(response, metadata.strict_login_check) {
        return false;
    }
    match serde_json::from_str::<Value>(&response.body) {
        Ok(body) => {
            let failed = body.get("status").and_then(Value::as_str) == Some("failure");
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_ascii_lowercase();
            !(failed && (error.contains("credentials") || error.contains("login")))
        }
        Err(_) => true,
    }
}

impl Schema for GazelleJsonSchema {
    fn name(&self) -> &'static str {
        "gazelle_json"
    }

    fn defaults(&self) -> Value {
        let layer = json!({
            "schema": "gazelle_json",
            "search": {
                "keywordPath": "params.searchstr",
                "requestConfig": {
                    "url": "/ajax.php",
                    "responseType": "json",
                    "params": { "action": "browse" }
                },
                "selectors": {
                    "rows": {
                        "selector": "response.results",
                        "group": {
                            "childrenPath": "torrents",
                            "inherit": ["title", "category"],
                            "selectors": {
                                "title": { "selector": "groupName" },
                                "category": { "selector": ["releaseType", "category"] }
                            }
                        }
                    },
                    "id": { "selector": "torrentId" },
                    "title": { "selector": "groupName" },
                    "subTitle": { "selector": ":self", "elementProcess": "gazelleJsonEdition" },
                    "url": {
                        "selector": "torrentId",
                        "filters": [{ "name": "prepend", "args": ["/torrents.php?torrentid="] }]
                    },
                    "link": {
                        "selector": "torrentId",
                        "filters": [{ "name": "prepend", "args": ["/torrents.php?action=download&id="] }]
                    },
                    "time": { "selector": ["time", "groupTime"] },
                    "size": { "selector": "size" },
                    "seeders": { "selector": "seeders" },
                    "leechers": { "selector": "leechers" },
                    "completed": { "selector": "snatches" }
                }
            },
            "userInfo": {
                "process": [
                    {
                        "requestConfig": {
                            "url": "/ajax.php",
                            "params": { "action": "index" },
                            "responseType": "json"
                        },
                        "fields": ["id", "name", "uploaded", "downloaded", "levelName", "messageCount"]
                    },
                    {
                        "requestConfig": {
                            "url": "/ajax.php",
                            "params": { "action": "user", "id": "$id$" },
                            "responseType": "json"
                        },
                        "assertion": { "id": "params.id" },
                        "fields": ["joinTime", "uploads", "snatches", "seeding", "leeching"]
                    }
                ],
                "selectors": {
                    "id": { "selector": "response.id" },
                    "name": { "selector": "response.username" },
                    "uploaded": { "selector": "response.userstats.uploaded" },
                    "downloaded": { "selector": "response.userstats.downloaded" },
                    "levelName": { "selector": "response.userstats.class" },
                    "messageCount": { "selector": "response.notifications.messages" },
                    "joinTime": { "selector": "response.stats.joinedDate", "filters": ["parseTime"] },
                    "uploads": { "selector": "response.community.uploaded" },
                    "snatches": { "selector": "response.community.snatched" },
                    "seeding": { "selector": "response.community.seeding" },
                    "leeching": { "selector": "response.community.leeching" }
                }
            }
        });
        merge_layers(PrivateSchema.defaults(), &[&layer])
    }

    fn hooks(&self) -> SiteHooks {
        SiteHooks::new()
            .element_processor("gazelleJsonEdition", edition)
            .login_check(api_logged_in)
            .authorizer(std::sync::Arc::new(ApiKeyAuthorizer::new("apikey")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SiteMetadata;
    use crate::transport::{RequestConfig, Transport, TransportError};
    use std::collections::BTreeMap;

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn request(&self, _config: &RequestConfig) -> Result<Response, TransportError> {
            Err(TransportError::Connection("offline".into()))
        }
    }

    fn response(body: &str) -> Response {
        Response {
            status: 200,
            headers: BTreeMap::new(),
            body: body.to_string(),
            final_url: "https://tracker.example/ajax.php?action=index".to_string(),
        }
    }

    #[test]
    fn test_edition_line() {
        let torrent = json!({"format": "FLAC", "encoding": "Lossless", "media": "CD", "remasterTitle": ""});
        assert_eq!(edition(Source::Json(&torrent)), json!("FLAC / Lossless / CD"));
    }

    #[test]
    fn test_failure_status_is_logged_out() {
        let metadata = SiteMetadata::default();
        assert!(!api_logged_in(&response(r#"{"status":"failure","error":"bad credentials"}"#), &metadata));
        assert!(api_logged_in(&response(r#"{"status":"failure","error":"no results"}"#), &metadata));
        assert!(api_logged_in(&response(r#"{"status":"success","response":{}}"#), &metadata));
    }

    #[tokio::test]
    async fn test_api_key_header_added_once() {
        let mut metadata = SiteMetadata::default();
        metadata.user_input.insert("apikey".into(), "secret".into());
        let transport = Unreachable;
        let ctx = AuthorizeContext {
            metadata: &metadata,
            transport: &transport,
        };

        let mut request = json!({"url": "/ajax.php"});
        ApiKeyAuthorizer::new("apikey")
            .authorize(&ctx, &mut request)
            .await
            .unwrap();
        assert_eq!(request["headers"]["Authorization"], json!("secret"));

        let mut preset = json!({"headers": {"Authorization": "mine"}});
        ApiKeyAuthorizer::new("apikey")
            .authorize(&ctx, &mut preset)
            .await
            .unwrap();
        assert_eq!(preset["headers"]["Authorization"], json!("mine"));
    }
}
