//! Upload routes.
//!
//! - `POST /{id}/{filename}` stores the raw request body
//! - `POST /` stores every part of a multipart form independently

use std::io;

use axum::{
    Json, Router,
    body::Body,
    extract::{
        Multipart, Path, State,
        multipart::{Field, MultipartRejection},
    },
    http::StatusCode,
    routing::post,
};
use futures::TryStreamExt;
use imagestore_core::storage::{StorageError, StoredObjectPath};
use imagestore_core::upload::UploadResult;
use tokio_util::io::StreamReader;
use tracing::{info, warn};

use super::OBJECT_PATH;
use crate::{AppState, error::ApiError};

/// Creates the upload routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(upload_multipart))
        .route(OBJECT_PATH, post(upload_file))
}

/// POST `/{id}/{filename}`
/// Stream the request body into storage.
async fn upload_file(
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
    body: Body,
) -> Result<StatusCode, ApiError> {
    let path = StoredObjectPath::new(&id, &filename).inspect_err(|e| {
        warn!(id = %id, filename = %filename, error = %e, "Rejected upload path");
    })?;

    let stream = body.into_data_stream().map_err(io::Error::other);
    let mut reader = state.upload_limit.reader(StreamReader::new(stream));

    let bytes = state
        .storage
        .save(&path, &mut reader)
        .await
        .inspect_err(|e| warn!(path = %path, error = %e, "Failed to save file"))?;

    info!(path = %path, bytes, "File saved");
    Ok(StatusCode::OK)
}

/// POST `/`
/// Store each multipart part under the path it declares.
///
/// Parts are processed in arrival order and a failing part never aborts the
/// batch; only broken multipart framing fails the whole request.
async fn upload_multipart(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<UploadResult>>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let mut results = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart data: {e}")))?
    {
        let result = match part_path(&field) {
            Ok(path) => save_part(&state, path, field).await,
            Err(err) => {
                let declared = declared_path(&field);
                warn!(declared = ?declared, error = %err, "Rejected multipart part");
                UploadResult::failed(declared, err)
            }
        };
        results.push(result);
    }

    let stored = results.iter().filter(|r| r.is_stored()).count();
    info!(
        parts = results.len(),
        stored,
        failed = results.len() - stored,
        "Multipart upload processed"
    );

    Ok(Json(results))
}

/// Streams one part into storage and records the outcome.
async fn save_part(state: &AppState, path: StoredObjectPath, field: Field<'_>) -> UploadResult {
    let stream = Box::pin(field.map_err(io::Error::other));
    let mut reader = state.upload_limit.reader(StreamReader::new(stream));

    match state.storage.save(&path, &mut reader).await {
        Ok(bytes) => {
            info!(path = %path, bytes, "Multipart file saved");
            UploadResult::stored(path)
        }
        Err(err) => {
            warn!(path = %path, error = %err, "Failed to save multipart file");
            UploadResult::failed(Some(path.to_string()), err)
        }
    }
}

/// Target path of a part.
///
/// With a `filename` attribute the field name is the collection id
/// (`name="42"; filename="cat.png"`); without one the field name must be
/// the whole `{id}/{filename}` path.
fn part_path(field: &Field<'_>) -> Result<StoredObjectPath, StorageError> {
    match (field.name(), field.file_name()) {
        (Some(id), Some(filename)) => StoredObjectPath::new(id, filename),
        (Some(path), None) => path.parse(),
        (None, _) => Err(StorageError::invalid_path("multipart part has no field name")),
    }
}

/// Path as the client declared it, for error reporting.
fn declared_path(field: &Field<'_>) -> Option<String> {
    match (field.name(), field.file_name()) {
        (Some(id), Some(filename)) => Some(format!("{id}/{filename}")),
        (Some(path), None) => Some(path.to_string()),
        (None, Some(filename)) => Some(filename.to_string()),
        (None, None) => None,
    }
}
