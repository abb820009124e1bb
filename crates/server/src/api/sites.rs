//! Site API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use trackhub_core::{
    metadata::{CategoryDef, LevelRequirement, SiteType},
    Site, SiteError, Torrent, UserInfo,
};

use super::{api_error, site_not_found, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SiteSummary {
    pub id: String,
    pub name: String,
    pub schema: String,
    #[serde(rename = "type")]
    pub site_type: SiteType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub is_offline: bool,
    pub allow_search: bool,
    pub allow_query_user_info: bool,
}

impl From<&Site> for SiteSummary {
    fn from(site: &Site) -> Self {
        let metadata = site.metadata();
        Self {
            id: metadata.id.clone(),
            name: metadata.name.clone(),
            schema: metadata.schema.clone(),
            site_type: metadata.site_type,
            url: metadata.base_url().map(str::to_string),
            tags: metadata.tags.clone(),
            is_offline: metadata.is_offline,
            allow_search: metadata.allow_search(),
            allow_query_user_info: metadata.allow_query_user_info(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SitesResponse {
    pub sites: Vec<SiteSummary>,
}

/// Site details; configured credentials are listed by name only.
#[derive(Debug, Serialize)]
pub struct SiteDetailResponse {
    #[serde(flatten)]
    pub summary: SiteSummary,
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone_offset: Option<String>,
    pub search_entries: Vec<String>,
    pub categories: Vec<CategoryDef>,
    pub level_requirements: Vec<LevelRequirement>,
    pub user_input: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserInfoRequest {
    /// Last known record, seeds the `pickLast` fields
    #[serde(default)]
    pub previous: Option<UserInfo>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadLinkRequest {
    pub torrent: Torrent,
}

#[derive(Debug, Serialize)]
pub struct DownloadLinkResponse {
    pub link: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/sites
pub async fn list_sites(State(state): State<Arc<AppState>>) -> Json<SitesResponse> {
    Json(SitesResponse {
        sites: state.sites().map(SiteSummary::from).collect(),
    })
}

/// GET /api/v1/sites/{id}
pub async fn get_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SiteDetailResponse>, ApiError> {
    let site = state.site(&id).ok_or_else(|| site_not_found(&id))?;
    let metadata = site.metadata();
    let categories = metadata
        .search
        .as_ref()
        .map(|search| search.categories.clone())
        .unwrap_or_default();

    Ok(Json(SiteDetailResponse {
        summary: SiteSummary::from(site),
        urls: metadata.urls.clone(),
        timezone_offset: metadata.timezone_offset.clone(),
        search_entries: metadata.search_entry.keys().cloned().collect(),
        categories,
        level_requirements: metadata.level_requirements.clone(),
        user_input: metadata.user_input.keys().cloned().collect(),
    }))
}

/// POST /api/v1/sites/{id}/user-info
///
/// Remote failures are reported in the record's status; only a broken
/// site definition is an error response.
pub async fn user_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UserInfoRequest>,
) -> Result<Json<UserInfo>, ApiError> {
    let site = state.site(&id).ok_or_else(|| site_not_found(&id))?;
    match site.get_user_info(body.previous.as_ref()).await {
        Ok(info) => Ok(Json(info)),
        Err(e) => {
            warn!(site = %id, error = %e, "Broken user info definition");
            Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
        }
    }
}

/// POST /api/v1/sites/{id}/download-link
pub async fn download_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<DownloadLinkRequest>,
) -> Result<Json<DownloadLinkResponse>, ApiError> {
    let site = state.site(&id).ok_or_else(|| site_not_found(&id))?;
    match site.get_download_link(&body.torrent).await {
        Ok(link) => Ok(Json(DownloadLinkResponse { link })),
        Err(e) => {
            let status = match &e {
                SiteError::NeedLogin => StatusCode::UNAUTHORIZED,
                SiteError::NoDownloadLink => StatusCode::NOT_FOUND,
                SiteError::Transport(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err(api_error(status, e.to_string()))
        }
    }
}
