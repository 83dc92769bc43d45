//! Face masking through an external HTTP service.
//!
//! The service receives the PNG bytes as the request body and answers with
//! the masked image.

use std::time::Duration;

use async_trait::async_trait;
use taleify_jobs::capability::{CapabilityError, FaceMasker};

use crate::{ensure_success, transport};

pub struct HttpFaceMasker {
    client: reqwest::Client,
    url: String,
}

impl HttpFaceMasker {
    pub fn new(url: String, timeout: Duration) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl FaceMasker for HttpFaceMasker {
    async fn mask(&self, image: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(image.to_vec())
            .send()
            .await
            .map_err(transport)?;

        let response = ensure_success(response).await.map_err(|e| match e {
            CapabilityError::Service { status, body } => {
                CapabilityError::Processing(format!("masking service returned {status}: {body}"))
            }
            other => other,
        })?;

        let masked = response.bytes().await.map_err(transport)?;
        if masked.is_empty() {
            return Err(CapabilityError::InvalidResponse(
                "masking service returned an empty body".into(),
            ));
        }
        tracing::debug!(input = image.len(), output = masked.len(), "Face mask applied");
        Ok(masked.to_vec())
    }
}
