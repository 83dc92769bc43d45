//! External capabilities consumed by the page pipeline.
//!
//! Concrete adapters live in `taleify-imaging`; tests plug in fakes.

use async_trait::async_trait;

/// Failure reported by an external capability.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// The referenced input does not exist or is not reachable.
    #[error("not found: {0}")]
    NotFound(String),

    /// The input exists but could not be processed.
    #[error("processing failed: {0}")]
    Processing(String),

    /// The remote service answered with a non-success status.
    #[error("service error ({status}): {body}")]
    Service { status: u16, body: String },

    /// The request never produced a response (network, DNS, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered successfully but the payload was unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fixed knobs sent with every synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOptions {
    pub model: String,
    pub size: String,
    pub quality: String,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            model: "gpt-image-1".into(),
            size: "1024x1024".into(),
            quality: "high".into(),
        }
    }
}

/// One image-edit call. Images are PNG-encoded RGBA.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub source: Vec<u8>,
    /// Source with faces masked, when a masker is configured.
    pub masked_source: Option<Vec<u8>>,
    pub target: Vec<u8>,
    pub prompt: String,
    pub options: SynthesisOptions,
}

impl EditRequest {
    /// Images in the order the synthesizer expects them:
    /// source, masked source (if any), target.
    pub fn images(&self) -> Vec<&[u8]> {
        let mut images = vec![self.source.as_slice()];
        if let Some(masked) = &self.masked_source {
            images.push(masked.as_slice());
        }
        images.push(self.target.as_slice());
        images
    }
}

/// Turns an image reference (remote URL or storage-relative path) into bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<Vec<u8>, CapabilityError>;
}

/// Obscures faces in an image.
#[async_trait]
pub trait FaceMasker: Send + Sync {
    async fn mask(&self, image: &[u8]) -> Result<Vec<u8>, CapabilityError>;
}

/// Produces a new image from the inputs and prompt.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    async fn edit(&self, request: EditRequest) -> Result<Vec<u8>, CapabilityError>;
}

/// Persists result bytes and returns their public URL.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn save(&self, bytes: Vec<u8>, suggested_name: &str) -> Result<String, CapabilityError>;
}
