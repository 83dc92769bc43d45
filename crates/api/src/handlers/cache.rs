use axum::extract::State;
use axum::Json;
use taleify_jobs::service::CacheStatus;

use crate::middleware::api_key::ApiKey;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/cache/status
pub async fn cache_status(
    _key: ApiKey,
    State(state): State<AppState>,
) -> Json<DataResponse<CacheStatus>> {
    Json(DataResponse {
        data: state.jobs.cache_status(),
    })
}
