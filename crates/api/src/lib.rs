//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Upload routes (single file and multipart batch)
//! - Download route with gzip negotiation
//! - Upload size guard middleware
//! - Error responses

pub mod error;
pub mod middleware;
pub mod routes;

#[cfg(test)]
mod routes_tests;

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, http::StatusCode};
use imagestore_core::storage::StorageBackend;
use imagestore_core::upload::UploadLimit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Request timeout used unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Backend every upload and download goes through.
    pub storage: Arc<dyn StorageBackend>,
    /// Maximum accepted upload size.
    pub upload_limit: UploadLimit,
    /// Requests still running after this are answered with 408.
    pub request_timeout: Duration,
}

impl AppState {
    /// Creates application state.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, upload_limit: UploadLimit) -> Self {
        Self {
            storage,
            upload_limit,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::api_routes_with_state(state.clone()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
