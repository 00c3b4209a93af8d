//! Shared types, errors, and configuration for Imagestore.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error taxonomy with HTTP status mapping
//! - Configuration management

pub mod config;
pub mod error;

pub use config::{AppConfig, LogConfig, ServerConfig, StorageBackendKind, StorageSettings};
pub use error::AppError;
