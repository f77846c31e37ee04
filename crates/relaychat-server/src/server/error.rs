//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use relaychat_core::{DirectoryError, RelayError, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

/// Errors returned by the HTTP routes.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required query parameter was absent
    #[error("{0}")]
    MissingParameter(String),

    /// A query parameter failed to parse
    #[error("{0}")]
    InvalidParameter(String),

    /// `/ws` was requested without a WebSocket handshake
    #[error("WebSocket upgrade required")]
    UpgradeRequired,

    /// Login with unknown credentials
    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::MissingParameter(_) => (StatusCode::BAD_REQUEST, "missing_parameter"),
            ApiError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "invalid_parameter"),
            ApiError::UpgradeRequired => (StatusCode::BAD_REQUEST, "upgrade_required"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::Relay(RelayError::MissingUserId) => {
                (StatusCode::BAD_REQUEST, "missing_user_id")
            }
            ApiError::Relay(RelayError::InvalidUserId(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_user_id")
            }
            ApiError::Relay(RelayError::Store(_))
            | ApiError::Relay(RelayError::Directory(_))
            | ApiError::Store(_)
            | ApiError::Directory(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }
        (status, Json(ErrorResponse::new(code, &self.to_string()))).into_response()
    }
}
