//! Error types for blobsyncd

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blobsync_core::{DatabaseError, FetchError, NotificationError};
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors. All of them are startup failures; errors inside a
/// sync run are handled by the pipeline itself.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Source document setup error
    #[error("Source error: {0}")]
    Source(#[from] FetchError),

    /// Database setup error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Notifier setup error
    #[error("Notifier error: {0}")]
    Notification(#[from] NotificationError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for DaemonError {
    fn from(err: ::config::ConfigError) -> Self {
        DaemonError::Config(err.to_string())
    }
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or wrong event key
    #[error("Unauthorized")]
    Unauthorized,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
