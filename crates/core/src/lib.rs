//! Core storage logic for Imagestore.
//!
//! This crate owns everything that touches persisted bytes and has ZERO web
//! dependencies. Handlers in the api crate only talk to the types exported
//! here.
//!
//! # Modules
//!
//! - `storage` - Object paths, the `StorageBackend` trait and its implementations
//! - `upload` - Upload size limits and per-file upload results

pub mod storage;
pub mod upload;
