use crate::matcher::MatchError;
use crate::storage::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors returned by HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Catalog unavailable: {0}")]
    Unavailable(#[from] StorageError),
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InvalidArgument(msg) => ApiError::InvalidArgument(msg),
            MatchError::Storage(e) => ApiError::Unavailable(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(ref e) => {
                tracing::error!("Catalog error: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "catalog unavailable".to_string(),
                )
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
