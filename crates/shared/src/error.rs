//! Application-wide error types.

use thiserror::Error;

/// Application error types.
///
/// Every failure the service reports to a client falls into one of these
/// kinds. Server-side variants carry internal detail that is logged but
/// never echoed back verbatim.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed collection id or filename, or a path escaping the store root.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Declared or streamed payload exceeds the upload limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Requested object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request framing could not be understood.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Storage backend read or write failure.
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidPath(_) | Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::PayloadTooLarge(_) => 413,
            Self::Storage(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPath(_) => "invalid_path",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Storage(_) => "storage_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Returns true for failures caused by the server rather than the client.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Message that is safe to show to a client.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Storage(_) => "Storage operation failed".to_string(),
            Self::Internal(_) => "An error occurred".to_string(),
            other => other.to_string(),
        }
    }
}
