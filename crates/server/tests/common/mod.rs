//! Common test utilities for API testing with a mock transport.
//!
//! The fixture builds an in-process router over sites that talk to a
//! [`MockTransport`], so no tracker is ever contacted.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use trackhub_core::{config::SiteConfig, testing::MockTransport, Config, Site};
use trackhub_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use trackhub_core::testing::fixtures;

/// Test fixture for API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_search() {
///     let fixture = TestFixture::new(vec![fixtures::table_site_definition()]);
///     fixture.transport.add_route("/torrents.php", ok(page)).await;
///
///     let response = fixture.post("/api/v1/search", json!({ "keywords": "ubuntu" })).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Transport shared by every site - configure responses here
    pub transport: Arc<MockTransport>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// One active site per definition, all over the same mock transport.
    pub fn new(definitions: Vec<Value>) -> Self {
        Self::with_transport(definitions, MockTransport::new())
    }

    pub fn with_transport(definitions: Vec<Value>, transport: MockTransport) -> Self {
        let transport = Arc::new(transport);

        let mut config = Config::default();
        let sites: Vec<Site> = definitions
            .iter()
            .map(|definition| {
                let site = fixtures::site(definition, transport.clone());
                let mut site_config = SiteConfig {
                    id: site.id().to_string(),
                    ..SiteConfig::default()
                };
                site_config
                    .user_input
                    .insert("passkey".to_string(), "secret-passkey".to_string());
                config.sites.push(site_config);
                site
            })
            .collect();

        let state = Arc::new(AppState::new(config, sites));
        Self {
            router: create_router(state),
            transport,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = match body {
            Some(json) => {
                request_builder = request_builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_string(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request_builder.body(body).unwrap())
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
