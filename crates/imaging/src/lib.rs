//! Concrete adapters for the capabilities consumed by the page pipeline.
//!
//! - [`storage::LocalDiskStore`]: result and upload files on local disk.
//! - [`fetcher::StorageFetcher`]: resolves image references to bytes.
//! - [`openai::OpenAiImageEditor`]: the OpenAI image edit endpoint.
//! - [`masking::HttpFaceMasker`]: an external face-masking service.
//!
//! [`keywords::OpenAiKeywordGenerator`] serves the SEO keyword endpoint and
//! shares the OpenAI connection code.

pub mod fetcher;
pub mod keywords;
pub mod masking;
pub mod openai;
pub mod storage;

use taleify_jobs::capability::CapabilityError;

/// Return the response unchanged on a 2xx status, otherwise a
/// [`CapabilityError::Service`] carrying the status and body text.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, CapabilityError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(CapabilityError::Service {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Map a transport-level reqwest failure.
pub(crate) fn transport(e: reqwest::Error) -> CapabilityError {
    CapabilityError::Transport(e.to_string())
}
