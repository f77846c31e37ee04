//! Error types for the relay core.

use thiserror::Error;

/// Relay errors.
///
/// Only connection setup can fail in a way the caller sees. Failures while
/// handling a frame are logged by the router and never reach the sender.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The `userId` parameter was not supplied
    #[error("userId is missing")]
    MissingUserId,

    /// The `userId` parameter was not an integer
    #[error("Invalid userId: {0}")]
    InvalidUserId(String),

    /// Conversation store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Identity directory failure
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl RelayError {
    /// Create a new invalid user id error.
    pub fn invalid_user_id(raw: impl Into<String>) -> Self {
        Self::InvalidUserId(raw.into())
    }

    /// Whether the error was caused by the client's request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingUserId | Self::InvalidUserId(_))
    }
}

/// Conversation store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conversation store unavailable: {0}")]
    Unavailable(String),
}

/// Identity directory errors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Identity directory unavailable: {0}")]
    Unavailable(String),
}
