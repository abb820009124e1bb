use regex_lite::Regex;
use serde_json::Value;
use tracing::warn;

use super::rows::RowMapper;
use super::{Body, RowContext, Site, SiteError};
use crate::entity::Torrent;
use crate::metadata::{merge_layers, ListConfig, SearchEntry, SearchSelectors};
use crate::transport::ResponseType;

fn matches_url(list: &ListConfig, url: &str) -> bool {
    list.url_pattern.iter().any(|pattern| match Regex::new(pattern) {
        Ok(re) => re.is_match(url),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Invalid list url pattern");
            false
        }
    })
}

impl Site {
    /// The `list` block whose URL pattern matches `url`.
    pub fn list_config_for(&self, url: &str) -> Option<&ListConfig> {
        self.metadata.list.iter().find(|list| matches_url(list, url))
    }

    /// Map a non-search page (bookmarks, uploads, ...) that renders
    /// torrent rows.
    pub fn parse_list_page(&self, url: &str, body: &str) -> Result<Vec<Torrent>, SiteError> {
        let list = self
            .list_config_for(url)
            .ok_or_else(|| SiteError::InvalidMetadata(format!("no list block matches {}", url)))?;
        let selectors = self.list_selectors(list)?;

        let entry = SearchEntry::default();
        let request = Value::Null;
        let ctx = RowContext {
            keywords: "",
            entry: &entry,
            request: &request,
            final_url: url,
        };
        let body = Body::decode(ResponseType::Document, body)?;
        RowMapper::new(self, &selectors, &ctx).map(&body)
    }

    fn list_selectors(&self, list: &ListConfig) -> Result<SearchSelectors, SiteError> {
        let search = self
            .metadata
            .search
            .as_ref()
            .and_then(|s| s.selectors.as_ref());

        let to_value = |s: &SearchSelectors| {
            serde_json::to_value(s).map_err(|e| SiteError::InvalidMetadata(e.to_string()))
        };
        match (list.merge_search_selectors, search, &list.selectors) {
            (true, Some(search), Some(own)) => {
                let merged = merge_layers(to_value(search)?, &[&to_value(own)?]);
                serde_json::from_value(merged).map_err(|e| SiteError::InvalidMetadata(e.to_string()))
            }
            (true, Some(search), None) => Ok(search.clone()),
            (_, _, Some(own)) => Ok(own.clone()),
            (false, _, None) | (true, None, None) => Err(SiteError::InvalidMetadata(
                "list block has no selectors".into(),
            )),
        }
    }
}
