//! Storage configuration types.

use std::path::PathBuf;
use std::sync::Arc;

use imagestore_shared::{StorageBackendKind, StorageSettings};

use super::backend::StorageBackend;
use super::error::StorageError;
use super::local::LocalStorage;
use super::memory::MemoryStorage;
use crate::upload::UploadLimit;

/// Storage provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// Local filesystem rooted at a base directory.
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
    /// In-process memory (contents lost on restart).
    Memory,
}

impl StorageProvider {
    /// Create local filesystem provider.
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Get the provider name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LocalFs { .. } => "local",
            Self::Memory => "memory",
        }
    }

    /// Builds the backend this provider describes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be initialized, e.g. the
    /// local root cannot be created.
    pub fn build(&self) -> Result<Arc<dyn StorageBackend>, StorageError> {
        Ok(match self {
            Self::LocalFs { root } => Arc::new(LocalStorage::new(root.clone())?),
            Self::Memory => Arc::new(MemoryStorage::new()?),
        })
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Maximum upload size in bytes.
    pub max_file_size: u64,
}

impl StorageConfig {
    /// Default max file size: 5MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set maximum file size.
    #[must_use]
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Upload limit derived from `max_file_size`.
    #[must_use]
    pub fn upload_limit(&self) -> UploadLimit {
        UploadLimit::new(self.max_file_size)
    }
}

impl From<&StorageSettings> for StorageConfig {
    fn from(settings: &StorageSettings) -> Self {
        let provider = match settings.backend {
            StorageBackendKind::Local => StorageProvider::local_fs(settings.base_path.clone()),
            StorageBackendKind::Memory => StorageProvider::Memory,
        };
        Self::new(provider).with_max_file_size(settings.max_upload_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_provider_local() {
        let provider = StorageProvider::local_fs("./storage");
        assert_eq!(provider.name(), "local");
        assert_eq!(StorageProvider::Memory.name(), "memory");
    }

    #[test]
    fn test_storage_config_defaults() {
        let config = StorageConfig::new(StorageProvider::Memory);
        assert_eq!(config.max_file_size, StorageConfig::DEFAULT_MAX_FILE_SIZE);
        assert_eq!(
            config.upload_limit().max_bytes(),
            StorageConfig::DEFAULT_MAX_FILE_SIZE
        );
    }

    #[test]
    fn test_from_settings() {
        let settings = StorageSettings {
            backend: StorageBackendKind::Local,
            base_path: PathBuf::from("/srv/images"),
            max_upload_size: 2048,
        };
        let config = StorageConfig::from(&settings);
        assert_eq!(config.provider, StorageProvider::local_fs("/srv/images"));
        assert_eq!(config.upload_limit(), UploadLimit::new(2048));

        let settings = StorageSettings {
            backend: StorageBackendKind::Memory,
            ..StorageSettings::default()
        };
        assert_eq!(
            StorageConfig::from(&settings).provider,
            StorageProvider::Memory
        );
    }

    #[test]
    fn test_build_backends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("store");

        let local = StorageProvider::local_fs(&root).build().expect("local");
        assert_eq!(local.name(), "local");
        assert!(root.is_dir());

        let memory = StorageProvider::Memory.build().expect("memory");
        assert_eq!(memory.name(), "memory");
    }

    #[test]
    fn test_build_fails_when_root_is_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").expect("write");

        let err = StorageProvider::local_fs(&file).build().err().expect("error");
        assert!(matches!(err, StorageError::Configuration(_)));
    }
}
