use axum::routing::post;
use axum::Router;

use crate::handlers::process;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/initiate-process", post(process::initiate_process))
        .route("/process/book", post(process::process_book))
        .route("/process/status", post(process::process_status))
}
