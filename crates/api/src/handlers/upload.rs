//! Image upload into the shared storage directory.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use taleify_core::validation::{upload_extension, MAX_UPLOAD_BYTES};

use crate::error::{AppError, AppResult};
use crate::middleware::api_key::ApiKey;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    /// Storage-relative path, usable as an image reference.
    pub file_path: String,
    pub file_url: String,
}

fn too_large() -> AppError {
    AppError::PayloadTooLarge(format!(
        "File exceeds the {} MiB limit",
        MAX_UPLOAD_BYTES / (1024 * 1024)
    ))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        AppError::BadRequest(e.to_string())
    }
}

/// POST /api/v1/upload
///
/// Accepts a multipart form with a required `file` field (png, jpg or jpeg,
/// at most 10 MiB). The file is stored under a fresh UUID name.
pub async fn upload_file(
    _key: ApiKey,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut file_data: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(multipart_error)?;
            file_data = Some((filename, data.to_vec()));
        }
    }

    let (filename, data) =
        file_data.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    let ext = upload_extension(&filename)?;
    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(too_large());
    }

    let name = format!("{}.{ext}", uuid::Uuid::new_v4());
    let file_url = state
        .store
        .write(&name, &data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store upload: {e}")))?;

    tracing::info!(file = %name, size = data.len(), original = %filename, "File uploaded");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UploadedFile {
                file_path: state.store.relative_path(&name),
                file_url,
            },
        }),
    ))
}

