//! Error types for the proxy server.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tanjung_core::errors::{ConfigError, ProxyError};
use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    /// Failure while handling a generate request
    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// Body refused before it reached the handler, e.g. over the size limit
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Server configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        ServerError::Config(err.to_string())
    }
}

impl From<BytesRejection> for ServerError {
    fn from(rejection: BytesRejection) -> Self {
        ServerError::Rejected {
            status: rejection.status().as_u16(),
            message: rejection.body_text(),
        }
    }
}

impl ServerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::Proxy(e) => e.status_code(),
            ServerError::Rejected { status, .. } => *status,
            ServerError::Config(_) | ServerError::Internal(_) => 500,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::Proxy(e) => e.error_type(),
            ServerError::Rejected { .. } => "rejected_body",
            ServerError::Config(_) => "config_error",
            ServerError::Internal(_) => "internal_error",
        }
    }
}

/// Every failure is reported as `{"error": "<message>"}`.
impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
