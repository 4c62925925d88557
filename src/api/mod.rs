//! REST API endpoints.
//!
//! Axum-based HTTP API serving rating graphs, listings and viewport
//! recomputation for shared match histories.

pub mod routes;
pub mod state;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::models::RecordError;
use crate::storage::StorageError;
use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::NotFound(key) => ApiError::NotFound(format!("share key '{}'", key)),
            StorageError::InvalidKey(_) => ApiError::BadRequest(err.to_string()),
            StorageError::Io(_) | StorageError::Parse { .. } | StorageError::Join(_) => {
                tracing::error!("Failed to load match history: {}", err);
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        tracing::error!("Rejected match history: {}", err);
        ApiError::Internal(err.to_string())
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new().allow_origin(AllowOrigin::exact(value)),
        Err(_) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
            CorsLayer::new()
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/api/health", get(routes::meta::health))
        .route("/api/seasons", get(routes::meta::seasons))
        .route("/api/graph/:share_key", get(routes::graph::graph))
        .route("/api/graph/:share_key/viewport", post(routes::graph::viewport))
        .route("/api/graph/:share_key/range", post(routes::graph::range))
        .route("/api/matches/:share_key", get(routes::graph::matches))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_mapping() {
        assert!(matches!(
            ApiError::from(StorageError::NotFound("k".to_string())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(StorageError::InvalidKey("../k".to_string())),
            ApiError::BadRequest(_)
        ));
    }

    #[test]
    fn test_error_status_codes() {
        let resp = ApiError::NotFound("x".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::Internal("x".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
