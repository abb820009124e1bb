//! Default [`Transport`] backed by `reqwest`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::{query_pairs, HttpMethod, RequestConfig, Response, Transport, TransportError};

/// Client-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("trackhub/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Cookie-aware HTTP client that follows redirects.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, TransportError> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(&options.user_agent)
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| TransportError::Connection(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn map_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connection(e.to_string())
    } else {
        TransportError::Http(e.to_string())
    }
}

impl ReqwestTransport {
    /// Method, headers, timeout and body for `config`. GET requests and
    /// empty data carry no body.
    fn prepare(&self, config: &RequestConfig) -> Result<RequestBuilder, TransportError> {
        let url = config.full_url()?;
        let (method, may_have_body) = match config.method {
            HttpMethod::Get => (Method::GET, false),
            HttpMethod::Post => (Method::POST, true),
        };
        debug!(method = %method, url = %url, "Sending request");

        let mut builder = self.client.request(method, url);
        for (name, value) in &config.headers {
            builder = builder.header(name, value);
        }
        if let Some(ms) = config.timeout {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if !may_have_body {
            return Ok(builder);
        }

        let sends_json = config
            .header("content-type")
            .is_some_and(|ct| ct.contains("json"));
        Ok(match &config.data {
            Value::Null => builder,
            Value::Object(data) if data.is_empty() => builder,
            Value::String(raw) => builder.body(raw.clone()),
            Value::Object(data) if !sends_json => builder.form(&query_pairs(data)),
            other => builder.json(other),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn request(&self, config: &RequestConfig) -> Result<Response, TransportError> {
        let builder = self.prepare(config)?;
        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(map_error)?;

        debug!(status, final_url = %final_url, bytes = body.len(), "Received response");
        Ok(Response {
            status,
            headers,
            body,
            final_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = TransportOptions::default();
        assert_eq!(options.timeout_secs, 30);
        assert!(options.user_agent.starts_with("trackhub/"));
    }

    #[test]
    fn test_build_client() {
        assert!(ReqwestTransport::new(&TransportOptions::default()).is_ok());
    }

    fn built(config: &RequestConfig) -> reqwest::Request {
        let transport = ReqwestTransport::new(&TransportOptions::default()).unwrap();
        transport.prepare(config).unwrap().build().unwrap()
    }

    #[test]
    fn test_get_carries_no_body() {
        let config = RequestConfig {
            url: "https://tracker.example/torrents.php".into(),
            data: serde_json::json!({}),
            ..Default::default()
        };
        let request = built(&config);
        assert_eq!(request.method(), &Method::GET);
        assert!(request.body().is_none());
        assert!(request.headers().get(reqwest::header::CONTENT_TYPE).is_none());

        let config = RequestConfig {
            data: serde_json::json!({ "ignored": "on get" }),
            ..config
        };
        assert!(built(&config).body().is_none());
    }

    #[test]
    fn test_post_form_and_empty_data() {
        let config = RequestConfig {
            url: "https://tracker.example/takelogin.php".into(),
            method: HttpMethod::Post,
            data: serde_json::json!({ "username": "alice" }),
            ..Default::default()
        };
        let request = built(&config);
        assert!(request.body().is_some());
        assert_eq!(
            request.headers().get(reqwest::header::CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );

        let config = RequestConfig {
            data: serde_json::json!({}),
            ..config
        };
        assert!(built(&config).body().is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_sending() {
        let transport = ReqwestTransport::new(&TransportOptions::default()).unwrap();
        let config = RequestConfig {
            url: "relative/only".into(),
            ..Default::default()
        };
        let err = transport.request(&config).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }
}
