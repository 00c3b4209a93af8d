//! Storage error types.

use std::io;

use imagestore_shared::AppError;
use thiserror::Error;

use crate::upload::LimitExceeded;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Malformed id or filename, or a component escaping the root.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Object not found in storage.
    #[error("object not found: {path}")]
    NotFound {
        /// Logical path that was not found.
        path: String,
    },

    /// Streamed payload exceeded the configured limit.
    #[error("payload exceeds maximum allowed {limit} bytes")]
    PayloadTooLarge {
        /// Maximum allowed size.
        limit: u64,
    },

    /// Filesystem or stream I/O failure.
    #[error("storage I/O failed: {0}")]
    Io(#[source] io::Error),

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// OpenDAL operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Create an invalid path error.
    #[must_use]
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        // A limited reader reports overflow through the I/O channel.
        if let Some(exceeded) = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<LimitExceeded>())
        {
            return Self::PayloadTooLarge {
                limit: exceeded.limit,
            };
        }
        Self::Io(err)
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                path: err.to_string(),
            },
            _ => Self::Operation(err.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPath(msg) => Self::InvalidPath(msg),
            StorageError::NotFound { path } => Self::NotFound(path),
            err @ StorageError::PayloadTooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            err @ (StorageError::Io(_) | StorageError::Operation(_)) => {
                Self::Storage(err.to_string())
            }
            StorageError::Configuration(msg) => Self::Internal(msg),
        }
    }
}
