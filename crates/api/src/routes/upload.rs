use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use taleify_core::validation::MAX_UPLOAD_BYTES;

use crate::handlers::upload;
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/upload",
        post(upload::upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD)),
    )
}
