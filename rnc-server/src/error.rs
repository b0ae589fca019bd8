//! HTTP error type for rnc-server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request or failed validation (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Lifecycle transition not allowed (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Import file rejected (422)
    #[error("Import failed: {0}")]
    Import(String),

    /// Missing or wrong access password (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Privileged access disabled (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<rnc_common::Error> for ApiError {
    fn from(err: rnc_common::Error) -> Self {
        use rnc_common::Error;

        match err {
            Error::NotFound(what) => ApiError::NotFound(what),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::InvalidTransition(e) => ApiError::Conflict(e.to_string()),
            Error::Import(msg) => ApiError::Import(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("malformed multipart body: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "INVALID_TRANSITION", msg),
            ApiError::Import(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "IMPORT_FAILED", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
