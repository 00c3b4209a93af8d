//! Error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use imagestore_core::storage::StorageError;
use imagestore_shared::AppError;
use serde_json::json;
use tracing::error;

/// Handler error rendered as `{"error": code, "message": text}`.
///
/// Server-side failures are logged with their full detail; the client only
/// sees a generic message.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(AppError::BadRequest(msg.into()))
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.0.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": self.0.client_message()
            })),
        )
            .into_response()
    }
}
