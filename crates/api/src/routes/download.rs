//! Download route with gzip negotiation.

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use imagestore_core::storage::StoredObjectPath;
use tokio_util::io::ReaderStream;
use tower_http::compression::{CompressionLayer, predicate::SizeAbove};
use tracing::{debug, warn};

use super::OBJECT_PATH;
use crate::{AppState, error::ApiError};

/// Bodies smaller than this are sent uncompressed.
const MIN_COMPRESS_SIZE: u16 = 32;

/// Creates the download routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(OBJECT_PATH, get(download_file))
        .layer(compression_layer())
}

/// Gzip when the client sends `Accept-Encoding: gzip`, identity otherwise.
///
/// Image content types are compressed too; streamed bodies have no known
/// size and always pass the size predicate.
fn compression_layer() -> CompressionLayer<SizeAbove> {
    CompressionLayer::new()
        .gzip(true)
        .compress_when(SizeAbove::new(MIN_COMPRESS_SIZE))
}

/// GET `/{id}/{filename}`
/// Stream a stored file back to the client.
async fn download_file(
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let path = StoredObjectPath::new(&id, &filename)?;

    let reader = state
        .storage
        .get(&path)
        .await
        .inspect_err(|e| warn!(path = %path, error = %e, "Failed to open file"))?;

    debug!(path = %path, "Serving file");

    Ok((
        [(header::CONTENT_TYPE, content_type_for(path.extension()))],
        Body::from_stream(ReaderStream::new(reader)),
    )
        .into_response())
}

/// Content type for a stored file extension.
///
/// Stored filenames always carry a three-letter lowercase extension.
fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "tif" => "image/tiff",
        _ => "application/octet-stream",
    }
}
