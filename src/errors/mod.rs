/// Unified error handling module
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Why a telemetry fetch produced no data. Never fatal: the cache turns it
/// into a stale or unavailable result.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "UPSTREAM_ERROR",
            FetchError::Status(403) => "UPSTREAM_403",
            FetchError::Status(404) => "UPSTREAM_404",
            FetchError::Status(429) => "UPSTREAM_429",
            FetchError::Status(500..=599) => "UPSTREAM_5XX",
            FetchError::Status(_) => "UPSTREAM_ERROR",
            FetchError::Malformed(_) => "UPSTREAM_MALFORMED",
            FetchError::Timeout(_) => "UPSTREAM_TIMEOUT",
        }
    }
}

/// Unified error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Database(sqlx::Error),
    NotFound(String),
    InvalidInput(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Database(e) => write!(f, "Database error: {}", e),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(err)
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Database(e) => e.to_string(),
            ApiError::NotFound(msg) | ApiError::InvalidInput(msg) => msg.clone(),
        };

        let error_response = ErrorResponse {
            ok: false,
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
            },
        };

        // Always HTTP 200 with ok=false, the dashboard renders the message
        (StatusCode::OK, Json(error_response)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
