use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{PrivateSchema, Schema};
use crate::metadata::merge_layers;
use crate::path;
use crate::site::{AuthorizeContext, RequestAuthorizer, SiteError, SiteHooks};
use crate::transport::RequestConfig;

const AUTH_PATH: &str = "/api/v1/jackett/auth";

/// AvistaZ network sites (AvistaZ, PrivateHD, CinemaZ, ExoticaZ) through
/// their JSON API.
pub struct AvistazSchema;

/// Logs in once with the site's `username`/`password`/`pid` inputs and
/// sends the returned token as `Authorization: Bearer` from then on.
///
/// The token lives as long as the site; a failed login is retried on the
/// next request.
#[derive(Debug, Default)]
pub struct BearerTokenAuthorizer {
    token: OnceCell<String>,
}

impl BearerTokenAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_token(ctx: &AuthorizeContext<'_>) -> Result<String, SiteError> {
        let input = |key: &str| ctx.metadata.user_input.get(key).cloned();
        let (Some(username), Some(password), Some(pid)) =
            (input("username"), input("password"), input("pid"))
        else {
            warn!(site = %ctx.metadata.id, "Missing API credentials");
            return Err(SiteError::NeedLogin);
        };

        let config = RequestConfig::from_value(json!({
            "url": AUTH_PATH,
            "method": "post",
            "baseURL": ctx.metadata.base_url(),
            "responseType": "json",
            "data": { "username": username, "password": password, "pid": pid }
        }))?;
        debug!(site = %ctx.metadata.id, "Requesting API token");
        let response = ctx.transport.request(&config).await?;
        if !response.is_success() {
            return Err(SiteError::NeedLogin);
        }

        let body: Value = serde_json::from_str(&response.body)
            .map_err(|e| SiteError::Parse(format!("Invalid token response: {}", e)))?;
        body.get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or(SiteError::NeedLogin)
    }
}

#[async_trait]
impl RequestAuthorizer for BearerTokenAuthorizer {
    async fn authorize(
        &self,
        ctx: &AuthorizeContext<'_>,
        request: &mut Value,
    ) -> Result<(), SiteError> {
        let token = self
            .token
            .get_or_try_init(|| Self::fetch_token(ctx))
            .await?;
        path::set(
            request,
            "headers.Authorization",
            Value::String(format!("Bearer {}", token)),
        );
        Ok(())
    }
}

impl Schema for AvistazSchema {
    fn name(&self) -> &'static str {
        "avistaz"
    }

    fn defaults(&self) -> Value {
        let layer = json!({
            "schema": "avistaz",
            "allowQueryUserInfo": false,
            "search": {
                "keywordPath": "params.search",
                "requestConfig": {
                    "url": "/api/v1/jackett/torrents",
                    "responseType": "json",
                    "params": { "in": 1, "limit": 100 }
                },
                "advanceKeywordParams": {
                    "imdb": { "keywordPath": "params.imdb" },
                    "tmdb": { "keywordPath": "params.tmdb" }
                },
                "selectors": {
                    "rows": { "selector": "data" },
                    "id": { "selector": "id" },
                    "title": { "selector": "file_name" },
                    "url": { "selector": "url" },
                    "link": { "selector": "download" },
                    "time": { "selector": "created_at" },
                    "size": { "selector": "file_size" },
                    "seeders": { "selector": "seed" },
                    "leechers": { "selector": "leech" },
                    "completed": { "selector": "completed" },
                    "category": { "selector": "type" }
                }
            }
        });
        merge_layers(PrivateSchema.defaults(), &[&layer])
    }

    fn hooks(&self) -> SiteHooks {
        SiteHooks::new().authorizer(std::sync::Arc::new(BearerTokenAuthorizer::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SiteMetadata;
    use crate::testing::MockTransport;

    fn metadata(with_credentials: bool) -> SiteMetadata {
        let mut metadata: SiteMetadata = serde_json::from_value(json!({
            "id": "avz",
            "urls": ["https://avz.example/"]
        }))
        .unwrap();
        if with_credentials {
            for (key, value) in [("username", "u"), ("password", "p"), ("pid", "x")] {
                metadata.user_input.insert(key.into(), value.into());
            }
        }
        metadata
    }

    #[tokio::test]
    async fn test_token_is_fetched_once() {
        let transport = MockTransport::new().route_json(AUTH_PATH, &json!({"token": "t0k"}));
        let metadata = metadata(true);
        let ctx = AuthorizeContext {
            metadata: &metadata,
            transport: &transport,
        };
        let authorizer = BearerTokenAuthorizer::new();

        for _ in 0..3 {
            let mut request = json!({"url": "/api/v1/jackett/torrents"});
            authorizer.authorize(&ctx, &mut request).await.unwrap();
            assert_eq!(request["headers"]["Authorization"], json!("Bearer t0k"));
        }
        assert_eq!(transport.requests_to(AUTH_PATH).await, 1);
    }

    #[tokio::test]
    async fn test_missing_credentials_need_login() {
        let transport = MockTransport::new();
        let metadata = metadata(false);
        let ctx = AuthorizeContext {
            metadata: &metadata,
            transport: &transport,
        };
        let mut request = json!({});
        let result = BearerTokenAuthorizer::new().authorize(&ctx, &mut request).await;
        assert!(matches!(result, Err(SiteError::NeedLogin)));
        assert_eq!(transport.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_rejected_login_is_retried() {
        let transport = MockTransport::new().route_json(AUTH_PATH, &json!({"message": "bad"}));
        let metadata = metadata(true);
        let ctx = AuthorizeContext {
            metadata: &metadata,
            transport: &transport,
        };
        let authorizer = BearerTokenAuthorizer::new();
        for _ in 0..2 {
            let mut request = json!({});
            assert!(authorizer.authorize(&ctx, &mut request).await.is_err());
        }
        assert_eq!(transport.requests_to(AUTH_PATH).await, 2);
    }
}
