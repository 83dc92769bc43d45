//! Shared-secret check on the `X-API-Key` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use subtle::ConstantTimeEq;
use taleify_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Proof that the request carried the configured API key.
///
/// Add it as a handler parameter to protect the route:
///
/// ```ignore
/// async fn my_handler(_key: ApiKey, State(state): State<AppState>) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
///
/// When no key is configured every request passes.
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

impl FromRequestParts<AppState> for ApiKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.api_key.as_deref() else {
            return Ok(ApiKey);
        };

        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("API Key header missing".into()))
            })?;

        if !keys_match(provided, expected) {
            tracing::warn!(path = %parts.uri.path(), "Rejected request with invalid API key");
            return Err(AppError::Core(CoreError::Forbidden("Invalid API Key".into())));
        }

        Ok(ApiKey)
    }
}

/// Compare the provided key with the configured one in constant time.
fn keys_match(provided: &str, expected: &str) -> bool {
    bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}
