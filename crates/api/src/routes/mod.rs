//! API route definitions.

use axum::{Router, extract::DefaultBodyLimit, middleware};

use crate::{AppState, middleware::check_content_length};

pub mod download;
pub mod health;
pub mod upload;

/// Route pattern shared by single-file upload and download.
pub(crate) const OBJECT_PATH: &str = "/{id}/{filename}";

/// Creates the API router with all routes.
///
/// Upload routes sit behind the size guard; the download route is wrapped in
/// response compression. Both live on the same path, split by method.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let body_limit = usize::try_from(state.upload_limit.max_bytes()).unwrap_or(usize::MAX);

    let upload_routes = upload::routes()
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            check_content_length,
        ));

    Router::new()
        .merge(health::routes())
        .merge(download::routes())
        .merge(upload_routes)
}
