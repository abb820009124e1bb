//! Outbound HTTP as an injected capability.
//!
//! The engine builds requests as JSON (`requestConfig` layers are merged and
//! rewritten as plain values) and only turns them into a typed
//! [`RequestConfig`] right before handing them to a [`Transport`].

mod client;

pub use client::{ReqwestTransport, TransportOptions};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

use crate::filters::as_text;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "GET")]
    Get,
    #[serde(alias = "POST")]
    Post,
}

/// How the caller wants the body interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Document,
    Json,
    Text,
}

/// One outbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub response_type: ResponseType,
    #[serde(default, rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

fn default_url() -> String {
    "/".to_string()
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            method: HttpMethod::default(),
            params: Map::new(),
            data: Value::Null,
            headers: BTreeMap::new(),
            response_type: ResponseType::default(),
            base_url: None,
            timeout: None,
        }
    }
}

impl RequestConfig {
    pub fn from_value(value: Value) -> Result<Self, TransportError> {
        serde_json::from_value(value).map_err(|e| TransportError::InvalidUrl(e.to_string()))
    }

    /// Absolute URL with `params` appended as the query string.
    pub fn full_url(&self) -> Result<Url, TransportError> {
        let mut url = match Url::parse(&self.url) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self
                    .base_url
                    .as_deref()
                    .ok_or_else(|| TransportError::InvalidUrl(self.url.clone()))?;
                Url::parse(base)
                    .and_then(|base| base.join(&self.url))
                    .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", self.url, e)))?
            }
            Err(e) => return Err(TransportError::InvalidUrl(format!("{}: {}", self.url, e))),
        };

        let pairs = query_pairs(&self.params);
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Header lookup ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Flatten a params/data object into key/value pairs; arrays repeat the key.
pub fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    pairs.push((key.clone(), as_text(item)));
                }
            }
            other => pairs.push((key.clone(), as_text(other))),
        }
    }
    pairs
}

/// A decoded response. Header names are lowercase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    /// URL after redirects.
    pub final_url: String,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, config: &RequestConfig) -> Result<Response, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_defaults() {
        let config = RequestConfig::from_value(json!({})).unwrap();
        assert_eq!(config.url, "/");
        assert_eq!(config.method, HttpMethod::Get);
        assert_eq!(config.response_type, ResponseType::Document);
    }

    #[test]
    fn test_full_url_joins_base_and_params() {
        let config = RequestConfig::from_value(json!({
            "url": "/torrents.php",
            "baseURL": "https://tracker.example/",
            "method": "GET",
            "params": { "search": "ubuntu 24", "cat": [1, 2], "skip": null }
        }))
        .unwrap();
        let url = config.full_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://tracker.example/torrents.php?search=ubuntu+24&cat=1&cat=2"
        );
    }

    #[test]
    fn test_full_url_absolute_ignores_base() {
        let config = RequestConfig {
            url: "https://other.example/api".into(),
            base_url: Some("https://tracker.example/".into()),
            ..Default::default()
        };
        assert_eq!(config.full_url().unwrap().as_str(), "https://other.example/api");
    }

    #[test]
    fn test_relative_url_without_base_is_invalid() {
        let config = RequestConfig::default();
        assert!(matches!(config.full_url(), Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut config = RequestConfig::default();
        config
            .headers
            .insert("Content-Type".into(), "application/json".into());
        assert_eq!(config.header("content-type"), Some("application/json"));
    }
}
