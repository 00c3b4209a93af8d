//! Upload size guard.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::CONTENT_LENGTH},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{AppState, error::ApiError};

/// Reads the declared body length from `Content-Length`.
fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Rejects uploads whose declared size is missing, zero or above the limit.
///
/// Runs before the handler, so a rejected request's body is never read and
/// the storage backend is never called.
pub async fn check_content_length(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let declared = declared_length(request.headers());

    match state.upload_limit.check_declared(declared) {
        Ok(_) => next.run(request).await,
        Err(err) => {
            warn!(
                uri = %request.uri(),
                declared = ?declared,
                limit = state.upload_limit.max_bytes(),
                "Rejecting upload before reading body"
            );
            ApiError::from(err).into_response()
        }
    }
}
