//! Client for the OpenAI image edit endpoint.
//!
//! Sends a multipart `POST {base_url}/images/edits` with every input image as
//! an `image[]` part and decodes the base64 result.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use taleify_jobs::capability::{CapabilityError, EditRequest, ImageSynthesizer};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings for [`OpenAiImageEditor`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Bounds the whole request, upload and generation included.
    pub timeout: Duration,
}

/// Errors from the OpenAI client layer.
#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("OpenAI API key is not configured")]
    MissingApiKey,

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// OpenAI returned a non-2xx status code.
    #[error("OpenAI API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response did not contain an image.
    #[error("unexpected response: {0}")]
    Payload(String),

    #[error("result is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl From<OpenAiError> for CapabilityError {
    fn from(e: OpenAiError) -> Self {
        match e {
            OpenAiError::Api { status, body } => CapabilityError::Service { status, body },
            OpenAiError::Request(e) => CapabilityError::Transport(e.to_string()),
            OpenAiError::MissingApiKey => CapabilityError::Processing(e.to_string()),
            OpenAiError::Payload(_) | OpenAiError::Decode(_) => {
                CapabilityError::InvalidResponse(e.to_string())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct EditResponse {
    #[serde(default)]
    data: Vec<EditImage>,
}

#[derive(Debug, Deserialize)]
struct EditImage {
    b64_json: Option<String>,
}

/// Authenticated connection to the OpenAI REST API, shared by the image and
/// chat clients.
pub(crate) struct OpenAiConnection {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
}

impl OpenAiConnection {
    pub(crate) fn new(config: OpenAiConfig) -> Result<Self, OpenAiError> {
        if config.api_key.trim().is_empty() {
            return Err(OpenAiError::MissingApiKey);
        }
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
    }
}

impl std::fmt::Debug for OpenAiConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConnection")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Return the response unchanged on a 2xx status, otherwise
/// [`OpenAiError::Api`] with the status and body text.
pub(crate) async fn ensure_api_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, OpenAiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(OpenAiError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// [`ImageSynthesizer`] backed by OpenAI.
#[derive(Debug)]
pub struct OpenAiImageEditor {
    connection: OpenAiConnection,
}

impl OpenAiImageEditor {
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiError> {
        Ok(Self {
            connection: OpenAiConnection::new(config)?,
        })
    }

    /// Run one edit and return the decoded image bytes.
    pub async fn edit_image(&self, request: &EditRequest) -> Result<Vec<u8>, OpenAiError> {
        let mut form = Form::new();
        for (i, image) in request.images().into_iter().enumerate() {
            let part = Part::bytes(image.to_vec())
                .file_name(format!("image_{i}.png"))
                .mime_str("image/png")?;
            form = form.part("image[]", part);
        }
        let form = form
            .text("prompt", request.prompt.clone())
            .text("model", request.options.model.clone())
            .text("size", request.options.size.clone())
            .text("quality", request.options.quality.clone())
            .text("n", "1");

        tracing::debug!(
            model = %request.options.model,
            images = request.images().len(),
            prompt_chars = request.prompt.chars().count(),
            "Sending image edit request",
        );

        let response = self
            .connection
            .post("images/edits")
            .multipart(form)
            .send()
            .await?;
        let response = ensure_api_success(response).await?;

        let parsed: EditResponse = response.json().await?;
        let encoded = parsed
            .data
            .into_iter()
            .next()
            .and_then(|image| image.b64_json)
            .ok_or_else(|| OpenAiError::Payload("no b64_json image in response".into()))?;
        Ok(base64::engine::general_purpose::STANDARD.decode(encoded)?)
    }
}

#[async_trait]
impl ImageSynthesizer for OpenAiImageEditor {
    async fn edit(&self, request: EditRequest) -> Result<Vec<u8>, CapabilityError> {
        Ok(self.edit_image(&request).await?)
    }
}
