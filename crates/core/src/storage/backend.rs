//! Storage backend abstraction.

use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::error::StorageError;
use super::path::StoredObjectPath;

/// Readable byte stream of a stored object, positioned at its start.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Persists and retrieves byte streams keyed by [`StoredObjectPath`].
///
/// Implementations are shared between concurrent requests and must not
/// expose a partially written object: a reader racing a writer on the same
/// path observes either the previous content or the new content.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Copies `data` to completion under `path`, replacing any previous object.
    ///
    /// Returns the number of bytes written. On failure nothing becomes
    /// visible at `path` and partial artifacts are removed.
    async fn save(
        &self,
        path: &StoredObjectPath,
        data: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, StorageError>;

    /// Opens the object stored under `path`.
    ///
    /// Fails with `StorageError::NotFound` if nothing was saved there.
    async fn get(&self, path: &StoredObjectPath) -> Result<ObjectReader, StorageError>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}
