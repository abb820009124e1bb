//! Building and running one search request.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::rows::RowMapper;
use super::{Body, RowContext, Site, SiteError, TransformContext};
use crate::entity::{SearchResult, SearchStatus, Torrent};
use crate::metadata::{merge_layers, AdvanceKeywordConfig, SearchEntry};
use crate::path;

static ADVANCE_KEYWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9_]+)\|(.*)$").expect("advance keyword regex is valid"));

impl Site {
    /// Search the site. Never fails: every problem is reported through
    /// [`SearchResult::status`].
    ///
    /// `entry_override` is a partial [`SearchEntry`]; when it carries an
    /// `id` the matching `searchEntry` is layered in between.
    pub async fn search(&self, keywords: &str, entry_override: Option<&Value>) -> SearchResult {
        if !self.metadata.allow_search() {
            debug!(site = %self.id(), "Search not allowed");
            return SearchResult::empty(SearchStatus::PassParse);
        }

        let entry = match self.resolve_entry(entry_override) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(site = %self.id(), error = %e, "Invalid search entry");
                return SearchResult::empty(SearchStatus::ParseError);
            }
        };
        if !entry.is_enabled() {
            return SearchResult::empty(SearchStatus::PassParse);
        }

        let Some(request) = self.build_search_request(keywords, &entry) else {
            return SearchResult::empty(SearchStatus::PassParse);
        };

        let outcome = match self.send(request).await {
            Ok(exchange) => {
                let ctx = RowContext {
                    keywords,
                    entry: &entry,
                    request: &exchange.request,
                    final_url: &exchange.response.final_url,
                };
                Body::decode(exchange.response_type, &exchange.response.body)
                    .and_then(|body| self.map_search_rows(&entry, &body, &ctx))
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(torrents) => {
                debug!(site = %self.id(), count = torrents.len(), "Search finished");
                SearchResult::success(torrents)
            }
            Err(SiteError::NeedLogin) => SearchResult::empty(SearchStatus::NeedLogin),
            Err(SiteError::NoTorrents) => SearchResult::empty(SearchStatus::NoResults),
            Err(e) => {
                warn!(site = %self.id(), error = %e, "Search failed");
                SearchResult::empty(SearchStatus::ParseError)
            }
        }
    }

    /// The effective entry: `search`, then `searchEntry[id]`, then the override.
    pub fn resolve_entry(&self, entry_override: Option<&Value>) -> Result<SearchEntry, SiteError> {
        let Some(overlay) = entry_override else {
            return Ok(self.metadata.search.clone().unwrap_or_default());
        };
        let base = match &self.metadata.search {
            Some(search) => serde_json::to_value(search)
                .map_err(|e| SiteError::InvalidMetadata(e.to_string()))?,
            None => json!({}),
        };

        let named = overlay
            .get("id")
            .and_then(Value::as_str)
            .and_then(|id| self.metadata.search_entry.get(id))
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| SiteError::InvalidMetadata(e.to_string()))?;

        let mut layers: Vec<&Value> = Vec::new();
        if let Some(named) = &named {
            layers.push(named);
        }
        layers.push(overlay);
        serde_json::from_value(merge_layers(base, &layers))
            .map_err(|e| SiteError::InvalidMetadata(e.to_string()))
    }

    /// Request config for `keywords`, or `None` when the query is disabled
    /// on this site (a disabled advance keyword).
    pub fn build_search_request(&self, keywords: &str, entry: &SearchEntry) -> Option<Value> {
        let seed = json!({ "url": "/", "responseType": "document", "params": {}, "data": {} });
        let mut request = match &entry.request_config {
            Some(config) => merge_layers(seed, &[config]),
            None => seed,
        };

        let mut keywords = keywords.trim().to_string();
        let mut advance = None;
        let prefixed = ADVANCE_KEYWORD_RE
            .captures(&keywords)
            .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()));
        if let Some((prefix, rest)) = prefixed {
            match entry.advance_keyword_params.get(&prefix) {
                Some(config) if !config.is_enabled() => {
                    debug!(site = %self.id(), prefix = %prefix, "Advance keyword disabled");
                    return None;
                }
                Some(AdvanceKeywordConfig::Config(config)) => advance = Some(config),
                Some(AdvanceKeywordConfig::Flag(_)) => {}
                None => {
                    debug!(site = %self.id(), prefix = %prefix, "Unknown advance keyword prefix")
                }
            }
            keywords = rest;
        }

        if !keywords.is_empty() {
            path::set(&mut request, entry.keyword_path(), Value::String(keywords.clone()));
        }

        let ctx = TransformContext {
            metadata: &self.metadata,
            keywords: Some(&keywords),
            entry: Some(entry),
            user_info: None,
        };

        if let Some(advance) = advance {
            if let Some(config) = &advance.request_config {
                request = merge_layers(request, &[config]);
            }
            if let Some(target) = &advance.keyword_path {
                if let Some(value) = path::remove(&mut request, entry.keyword_path()) {
                    path::set(&mut request, target, value);
                }
            }
            request = self.transform(advance.request_config_transformer.as_deref(), &ctx, request);
        }

        Some(self.transform(entry.request_config_transformer.as_deref(), &ctx, request))
    }

    fn map_search_rows(
        &self,
        entry: &SearchEntry,
        body: &Body,
        ctx: &RowContext<'_>,
    ) -> Result<Vec<Torrent>, SiteError> {
        let selectors = entry
            .selectors
            .as_ref()
            .ok_or_else(|| SiteError::InvalidMetadata("search entry has no selectors".into()))?;
        RowMapper::new(self, selectors, ctx).map(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SiteMetadata;
    use crate::site::SiteHooks;
    use crate::testing::MockTransport;
    use std::sync::Arc;

    fn site(search: Value) -> Site {
        let metadata: SiteMetadata = serde_json::from_value(json!({
            "id": "demo",
            "urls": ["https://demo.example/"],
            "allowSearch": true,
            "search": search
        }))
        .unwrap();
        let hooks = SiteHooks::new().request_transformer("addSort", |_, mut request| {
            path::set(&mut request, "params.sort", json!("time"));
            request
        });
        Site::new(metadata, hooks, Arc::new(MockTransport::new()))
    }

    #[test]
    fn test_keywords_injected_at_default_path() {
        let site = site(json!({ "requestConfig": { "url": "/torrents.php" } }));
        let entry = site.resolve_entry(None).unwrap();
        let request = site.build_search_request("ubuntu", &entry).unwrap();
        assert_eq!(request["url"], json!("/torrents.php"));
        assert_eq!(request["params"]["keywords"], json!("ubuntu"));
        assert_eq!(request["responseType"], json!("document"));
    }

    #[test]
    fn test_empty_keywords_not_injected() {
        let site = site(json!({}));
        let entry = site.resolve_entry(None).unwrap();
        let request = site.build_search_request("  ", &entry).unwrap();
        assert!(!path::has(&request, "params.keywords"));
    }

    #[test]
    fn test_advance_keyword_moves_keywords() {
        let site = site(json!({
            "keywordPath": "params.search",
            "advanceKeywordParams": {
                "imdb": { "keywordPath": "params.imdb_id", "requestConfig": { "params": { "search_area": 4 } } }
            }
        }));
        let entry = site.resolve_entry(None).unwrap();
        let request = site.build_search_request("imdb|tt1234567", &entry).unwrap();
        assert_eq!(request["params"]["imdb_id"], json!("tt1234567"));
        assert_eq!(request["params"]["search_area"], json!(4));
        assert!(!path::has(&request, "params.search"));
    }

    #[test]
    fn test_disabled_advance_keyword_is_pass_parse() {
        let site = site(json!({ "advanceKeywordParams": { "douban": false } }));
        let entry = site.resolve_entry(None).unwrap();
        assert!(site.build_search_request("douban|123", &entry).is_none());
    }

    #[test]
    fn test_unknown_prefix_is_stripped() {
        let site = site(json!({}));
        let entry = site.resolve_entry(None).unwrap();
        let request = site.build_search_request("tmdb|603", &entry).unwrap();
        assert_eq!(request["params"]["keywords"], json!("603"));
    }

    #[test]
    fn test_entry_transformer_runs_last() {
        let site = site(json!({
            "requestConfigTransformer": "addSort",
            "advanceKeywordParams": { "imdb": { "requestConfig": { "params": { "sort": "size" } } } }
        }));
        let entry = site.resolve_entry(None).unwrap();
        let request = site.build_search_request("imdb|tt1", &entry).unwrap();
        assert_eq!(request["params"]["sort"], json!("time"));
    }

    #[test]
    fn test_entry_override_by_id() {
        let metadata: SiteMetadata = serde_json::from_value(json!({
            "id": "demo",
            "urls": ["https://demo.example/"],
            "search": { "requestConfig": { "url": "/torrents.php" } },
            "searchEntry": {
                "music": { "id": "music", "requestConfig": { "params": { "cat": 408 } } },
                "off": { "id": "off", "enabled": false }
            }
        }))
        .unwrap();
        let site = Site::new(metadata, SiteHooks::new(), Arc::new(MockTransport::new()));

        let entry = site.resolve_entry(Some(&json!({"id": "music"}))).unwrap();
        let request = site.build_search_request("x", &entry).unwrap();
        assert_eq!(request["url"], json!("/torrents.php"));
        assert_eq!(request["params"]["cat"], json!(408));

        let off = site.resolve_entry(Some(&json!({"id": "off"}))).unwrap();
        assert!(!off.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_entry_makes_no_request() {
        let transport = Arc::new(MockTransport::new());
        let metadata: SiteMetadata = serde_json::from_value(json!({
            "id": "demo",
            "urls": ["https://demo.example/"],
            "allowSearch": true,
            "search": { "enabled": false }
        }))
        .unwrap();
        let site = Site::new(metadata, SiteHooks::new(), transport.clone());
        let result = site.search("x", None).await;
        assert_eq!(result.status, SearchStatus::PassParse);
        assert_eq!(transport.request_count().await, 0);
    }
}
