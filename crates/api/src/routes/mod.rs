pub mod cache;
pub mod health;
pub mod process;
pub mod seo;
pub mod upload;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// POST   /initiate-process      create an empty process
/// POST   /process/book          submit one page (202, runs in background)
/// POST   /process/status        poll page statuses
/// POST   /upload                multipart image upload
/// GET    /cache/status          process cache introspection
/// POST   /generate-keywords     SEO keywords for a description
/// ```
///
/// Every route requires the `X-API-Key` header when an API key is configured.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(process::router())
        .merge(upload::router())
        .merge(cache::router())
        .merge(seo::router())
}
