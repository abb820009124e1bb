pub mod handlers;
pub mod routes;
pub mod search;
pub mod sites;

pub use routes::create_router;

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn site_not_found(id: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, format!("Site not found: {}", id))
}
