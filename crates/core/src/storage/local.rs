//! Local filesystem backend.

use std::ffi::OsStr;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use super::backend::{ObjectReader, StorageBackend};
use super::error::StorageError;
use super::path::StoredObjectPath;

/// Stores objects as files under `{root}/{collection_id}/{filename}`.
///
/// Uploads are written to a hidden temporary sibling and renamed into place
/// once fully synced, so readers never see a partial file.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Creates the backend, creating `root` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::configuration(format!(
                "unable to create storage root {}: {e}",
                root.display()
            ))
        })?;

        Ok(Self { root })
    }

    /// Maps a logical path to a location under the root.
    fn resolve(&self, path: &StoredObjectPath) -> Result<PathBuf, StorageError> {
        let collection = path.collection_id().to_string();
        let mut location = self.root.clone();
        location.push(normal_segment(&collection)?);
        location.push(normal_segment(path.filename())?);
        Ok(location)
    }
}

/// Accepts `segment` only if it is a single normal path component.
///
/// `..`, `.`, absolute paths and embedded separators are rejected even if
/// they slipped past path validation.
fn normal_segment(segment: &str) -> Result<&OsStr, StorageError> {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == OsStr::new(segment) => Ok(part),
        _ => Err(StorageError::invalid_path(format!(
            "segment '{segment}' escapes the storage root"
        ))),
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn save(
        &self,
        path: &StoredObjectPath,
        data: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, StorageError> {
        let destination = self.resolve(path)?;
        let directory = destination
            .parent()
            .ok_or_else(|| StorageError::invalid_path(path.key()))?;
        fs::create_dir_all(directory).await?;

        let pending = PendingFile::new(directory, path.filename());
        let written = match write_synced(pending.path(), data).await {
            Ok(written) => written,
            Err(e) => {
                warn!(path = %path, error = %e, "Upload copy failed, discarding partial file");
                return Err(e.into());
            }
        };

        fs::rename(pending.path(), &destination).await?;
        pending.keep();

        debug!(path = %path, bytes = written, "Stored file");
        Ok(written)
    }

    async fn get(&self, path: &StoredObjectPath) -> Result<ObjectReader, StorageError> {
        let location = self.resolve(path)?;

        match fs::File::open(&location).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::not_found(path.key()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Copies `data` into a freshly created file and syncs it to disk.
async fn write_synced(
    target: &Path,
    data: &mut (dyn AsyncRead + Send + Unpin),
) -> io::Result<u64> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .await?;

    let written = tokio::io::copy(data, &mut file).await?;
    file.flush().await?;
    file.sync_all().await?;

    Ok(written)
}

/// Temporary upload file removed on drop unless kept.
///
/// Dropping covers both error returns and cancellation, e.g. a client
/// disconnecting mid-upload drops the handler future.
struct PendingFile {
    path: PathBuf,
    armed: bool,
}

impl PendingFile {
    fn new(directory: &Path, filename: &str) -> Self {
        Self {
            path: directory.join(format!(".{filename}.{}.tmp", Uuid::new_v4().simple())),
            armed: true,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Disarms cleanup once the file has been renamed into place.
    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed partial upload"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove partial upload"
            ),
        }
    }
}
