use axum::routing::post;
use axum::Router;

use crate::handlers::seo;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/generate-keywords", post(seo::generate_keywords))
}
