use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::api_key::ApiKey;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct KeywordsRequest {
    #[validate(length(min = 1, max = 4000, message = "description must be 1-4000 characters"))]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct KeywordsData {
    pub keywords: Vec<String>,
}

/// POST /api/v1/generate-keywords
///
/// Ask the chat model for SEO keywords describing `description`.
/// Upstream failures are reported as 502.
pub async fn generate_keywords(
    _key: ApiKey,
    State(state): State<AppState>,
    Json(input): Json<KeywordsRequest>,
) -> AppResult<Json<DataResponse<KeywordsData>>> {
    input.validate()?;
    if input.description.trim().is_empty() {
        return Err(AppError::BadRequest("description must not be blank".into()));
    }

    let keywords = state
        .keywords
        .generate(input.description.trim())
        .await
        .map_err(|e| AppError::Upstream(format!("keyword generation failed: {e}")))?;

    Ok(Json(DataResponse {
        data: KeywordsData { keywords },
    }))
}
