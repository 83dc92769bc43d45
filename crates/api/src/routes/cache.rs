use axum::routing::get;
use axum::Router;

use crate::handlers::cache;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/cache/status", get(cache::cache_status))
}
