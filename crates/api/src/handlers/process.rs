//! Handlers for process initiation, page submission and status polling.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use taleify_core::types::ProcessId;
use taleify_core::validation::parse_id;
use taleify_jobs::service::SubmitPage;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::api_key::ApiKey;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct InitiateData {
    pub init_id: ProcessId,
    /// Always empty: a new process has no pages.
    pub status: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProcessBookRequest {
    #[validate(length(min = 1, message = "init_id is required"))]
    pub init_id: String,
    #[validate(length(min = 1, message = "source_url is required"))]
    pub source_url: String,
    #[validate(length(min = 1, message = "target_url is required"))]
    pub target_url: String,
    /// Prompt document; see `taleify_core::prompt`.
    #[serde(default = "empty_prompt")]
    pub prompt: serde_json::Value,
}

fn empty_prompt() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProcessStatusRequest {
    #[validate(length(min = 1, message = "process_id is required"))]
    pub process_id: String,
    #[serde(default)]
    pub page_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/initiate-process
///
/// Create an empty process. Returns 201 with its id.
pub async fn initiate_process(
    _key: ApiKey,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let init_id = state.jobs.initiate()?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: InitiateData {
                init_id,
                status: serde_json::Map::new(),
            },
        }),
    ))
}

/// POST /api/v1/process/book
///
/// Register one page under an existing process and start processing it in
/// the background. Returns 202 with the page in `PENDING`.
pub async fn process_book(
    _key: ApiKey,
    State(state): State<AppState>,
    Json(input): Json<ProcessBookRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let process_id = parse_id("init_id", &input.init_id)?;

    let status = state.jobs.submit_page(
        process_id,
        SubmitPage {
            source_ref: input.source_url,
            target_ref: input.target_url,
            prompt: input.prompt,
        },
    )?;

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: status })))
}

/// POST /api/v1/process/status
///
/// Status of one page, or of every page of the process when `page_id` is
/// omitted.
pub async fn process_status(
    _key: ApiKey,
    State(state): State<AppState>,
    Json(input): Json<ProcessStatusRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let process_id = parse_id("process_id", &input.process_id)?;
    let page_id = input
        .page_id
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_id("page_id", raw))
        .transpose()?;

    let statuses = state.jobs.get_status(process_id, page_id)?;
    tracing::debug!(%process_id, pages = statuses.len(), "Status retrieved");
    Ok(Json(DataResponse { data: statuses }))
}
