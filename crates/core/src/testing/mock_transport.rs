//! Mock transport for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::transport::{RequestConfig, Response, Transport, TransportError};

/// A request as received by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// The config the engine sent.
    pub config: RequestConfig,
    /// Resolved absolute URL including the query string.
    pub url: String,
}

#[derive(Debug, Clone)]
enum Reply {
    Respond(Response),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Route {
    pattern: String,
    reply: Reply,
}

/// Mock implementation of the [`Transport`] trait.
///
/// Replies are chosen by URL substring; the first registered route whose
/// pattern occurs in the resolved URL wins. Unmatched requests get a 404.
/// Every request is recorded for assertions.
///
/// # Example
///
/// ```rust,ignore
/// use trackhub_core::testing::MockTransport;
///
/// let transport = MockTransport::new()
///     .route("/torrents.php", "<table>...</table>")
///     .route_json("/ajax.php", &json!({"status": "success"}));
///
/// // ... run a search ...
///
/// assert_eq!(transport.request_count().await, 1);
/// assert!(transport.requests().await[0].url.contains("search=ubuntu"));
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: RwLock<Vec<Route>>,
    requests: RwLock<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, pattern: impl Into<String>, reply: Reply) -> Self {
        self.routes.get_mut().push(Route {
            pattern: pattern.into(),
            reply,
        });
        self
    }

    /// Serve `body` with status 200.
    pub fn route(self, pattern: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_response(pattern, ok(body))
    }

    pub fn route_json(self, pattern: impl Into<String>, body: &Value) -> Self {
        let mut response = ok(body.to_string());
        response
            .headers
            .insert("content-type".into(), "application/json".into());
        self.with_response(pattern, response)
    }

    /// Serve a fully specified response. An empty `final_url` is replaced
    /// by the request URL.
    pub fn with_response(self, pattern: impl Into<String>, response: Response) -> Self {
        self.push(pattern, Reply::Respond(response))
    }

    /// Fail matching requests with a connection error.
    pub fn fail(self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.push(pattern, Reply::Fail(message.into()))
    }

    /// Register a route after construction.
    pub async fn add_route(&self, pattern: impl Into<String>, response: Response) {
        self.routes.write().await.push(Route {
            pattern: pattern.into(),
            reply: Reply::Respond(response),
        });
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Number of recorded requests whose URL contains `pattern`.
    pub async fn requests_to(&self, pattern: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.url.contains(pattern))
            .count()
    }

    pub async fn clear_requests(&self) {
        self.requests.write().await.clear();
    }
}

/// A 200 response with `body` and no headers.
pub fn ok(body: impl Into<String>) -> Response {
    Response {
        status: 200,
        headers: BTreeMap::new(),
        body: body.into(),
        final_url: String::new(),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, config: &RequestConfig) -> Result<Response, TransportError> {
        let url = config.full_url()?.to_string();
        self.requests.write().await.push(RecordedRequest {
            config: config.clone(),
            url: url.clone(),
        });

        let reply = self
            .routes
            .read()
            .await
            .iter()
            .find(|route| url.contains(&route.pattern))
            .map(|route| route.reply.clone());

        match reply {
            Some(Reply::Respond(mut response)) => {
                if response.final_url.is_empty() {
                    response.final_url = url;
                }
                Ok(response)
            }
            Some(Reply::Fail(message)) => Err(TransportError::Connection(message)),
            None => Ok(Response {
                status: 404,
                headers: BTreeMap::new(),
                body: String::new(),
                final_url: url,
            }),
        }
    }
}
