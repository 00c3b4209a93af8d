//! Storage backends for uploaded files.
//!
//! All persisted bytes go through a [`StorageBackend`]. Two providers exist:
//! - Local filesystem rooted at a base directory (default)
//! - In-memory object store via Apache OpenDAL (ephemeral deployments, tests)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  StorageBackend (async trait)                    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ save(path, reader) -> bytes written  │ get(path) -> reader      │
//! ├──────────────────────────────────────┴──────────────────────────┤
//! │ LocalStorage: temp file + fsync + rename │ MemoryStorage: OpenDAL│
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod backend;
mod config;
mod error;
mod local;
mod memory;
mod path;

pub use backend::{ObjectReader, StorageBackend};
pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use path::StoredObjectPath;
