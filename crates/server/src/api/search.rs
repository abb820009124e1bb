//! Search API handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use trackhub_core::{SearchResult, SearchStatus, Site, Torrent};

use super::{api_error, site_not_found, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub keywords: String,
    /// Restrict the fan-out to these site ids (default: every active site)
    #[serde(default)]
    pub sites: Option<Vec<String>>,
    /// Partial search entry layered over each site's own
    #[serde(default)]
    pub entry: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SiteSearchRequest {
    pub keywords: String,
    #[serde(default)]
    pub entry: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct SiteSearchSummary {
    pub site: String,
    pub status: SearchStatus,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub keywords: String,
    pub sites: Vec<SiteSearchSummary>,
    pub torrents: Vec<Torrent>,
    pub duration_ms: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/search
///
/// Search every selected site concurrently and concatenate the results.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let selected: Vec<&Site> = match &body.sites {
        Some(ids) => {
            let unknown: Vec<&str> = ids
                .iter()
                .filter(|id| state.site(id).is_none())
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    format!("Unknown site(s): {}", unknown.join(", ")),
                ));
            }
            ids.iter().filter_map(|id| state.site(id)).collect()
        }
        None => state.sites().collect(),
    };

    let started = Instant::now();
    let keywords = body.keywords.as_str();
    let entry = body.entry.as_ref();
    let results: Vec<(String, SearchResult)> = join_all(selected.into_iter().map(|site| async move {
        (site.id().to_string(), site.search(keywords, entry).await)
    }))
    .await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let mut sites = Vec::with_capacity(results.len());
    let mut torrents = Vec::new();
    for (site, result) in results {
        sites.push(SiteSearchSummary {
            site,
            status: result.status,
            count: result.data.len(),
        });
        torrents.extend(result.data);
    }

    info!(
        keywords = %body.keywords,
        sites = sites.len(),
        results = torrents.len(),
        duration_ms,
        "Search executed"
    );

    Ok(Json(SearchResponse {
        keywords: body.keywords,
        sites,
        torrents,
        duration_ms,
    }))
}

/// POST /api/v1/sites/{id}/search
pub async fn search_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SiteSearchRequest>,
) -> Result<Json<SearchResult>, ApiError> {
    let site = state.site(&id).ok_or_else(|| site_not_found(&id))?;
    Ok(Json(site.search(&body.keywords, body.entry.as_ref()).await))
}
