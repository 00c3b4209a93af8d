//! Per-file outcome of a batch upload.

use imagestore_shared::AppError;
use serde::Serialize;

use crate::storage::{StorageError, StoredObjectPath};

/// Client-facing description of why one file failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable message, free of internal detail.
    pub message: String,
}

impl From<&AppError> for UploadFailure {
    fn from(err: &AppError) -> Self {
        Self {
            error: err.error_code(),
            message: err.client_message(),
        }
    }
}

/// Outcome of one uploaded file.
///
/// Serialized as `{"path": "1/abc.png"}` on success and as
/// `{"path": ..., "error": {"error": ..., "message": ...}}` on failure.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UploadResult {
    /// File was stored.
    Stored {
        /// Where the file now lives.
        path: StoredObjectPath,
    },
    /// File was rejected or could not be stored.
    Failed {
        /// Path as declared by the client, if any.
        path: Option<String>,
        /// What went wrong.
        error: UploadFailure,
    },
}

impl UploadResult {
    /// Successful outcome.
    #[must_use]
    pub fn stored(path: StoredObjectPath) -> Self {
        Self::Stored { path }
    }

    /// Failed outcome for the part declared as `declared`.
    #[must_use]
    pub fn failed(declared: Option<String>, err: StorageError) -> Self {
        let err = AppError::from(err);
        Self::Failed {
            path: declared,
            error: UploadFailure::from(&err),
        }
    }

    /// Returns true if the file was stored.
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}
