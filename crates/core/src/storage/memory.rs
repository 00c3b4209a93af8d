//! In-process object store backed by OpenDAL's memory service.

use async_trait::async_trait;
use bytes::Bytes;
use opendal::{Operator, Writer, services};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use super::backend::{ObjectReader, StorageBackend};
use super::error::StorageError;
use super::path::StoredObjectPath;

/// Size of the buffer used to move bytes into the writer.
const CHUNK_SIZE: usize = 64 * 1024;

/// Keeps objects in memory under their `{id}/{filename}` key.
///
/// An OpenDAL writer only publishes the object on `close`, so a failed or
/// abandoned upload never replaces existing content.
#[derive(Clone)]
pub struct MemoryStorage {
    operator: Operator,
}

impl MemoryStorage {
    /// Creates an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be built.
    pub fn new() -> Result<Self, StorageError> {
        let operator = Operator::new(services::Memory::default())
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();

        Ok(Self { operator })
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn save(
        &self,
        path: &StoredObjectPath,
        data: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, StorageError> {
        let key = path.key();
        let mut writer = self.operator.writer(&key).await?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written = 0u64;

        loop {
            let read = match data.read(&mut buf).await {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) => {
                    abort(&mut writer, &key).await;
                    return Err(e.into());
                }
            };

            if let Err(e) = writer.write(Bytes::copy_from_slice(&buf[..read])).await {
                abort(&mut writer, &key).await;
                return Err(e.into());
            }
            written += read as u64;
        }

        if let Err(e) = writer.close().await {
            abort(&mut writer, &key).await;
            return Err(e.into());
        }

        debug!(path = %path, bytes = written, "Stored object in memory");
        Ok(written)
    }

    async fn get(&self, path: &StoredObjectPath) -> Result<ObjectReader, StorageError> {
        let key = path.key();

        match self.operator.stat(&key).await {
            Ok(_) => {}
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => {
                return Err(StorageError::not_found(key));
            }
            Err(e) => return Err(e.into()),
        }

        let stream = self
            .operator
            .reader(&key)
            .await?
            .into_bytes_stream(..)
            .await?;

        Ok(Box::pin(StreamReader::new(stream)))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

async fn abort(writer: &mut Writer, key: &str) {
    if let Err(e) = writer.abort().await {
        warn!(key, error = %e, "Failed to abort object write");
    }
}
