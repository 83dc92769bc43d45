//! Processing of a single page, from pending to a terminal state.
//!
//! [`PagePipeline::run`] never fails: every error, timeout or panic inside the
//! pipeline is turned into a `Failed` page with a readable message, so a page
//! cannot be left at `Processing` by a pipeline that returned.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use taleify_core::error::CoreError;
use taleify_core::page::PageState;
use taleify_core::prompt::render_prompt;
use taleify_core::types::{PageId, ProcessId};

use crate::capability::{
    CapabilityError, DurableStore, EditRequest, FaceMasker, ImageFetcher, ImageSynthesizer,
    SynthesisOptions,
};
use crate::convert::{extension_for, to_rgba_png};
use crate::registry::JobRegistry;
use crate::runner::panic_message;

/// Default bound on each external call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(180);

/// Everything needed to process one page.
#[derive(Debug, Clone)]
pub struct PageJob {
    pub process_id: ProcessId,
    pub page_id: PageId,
    pub source_ref: String,
    pub target_ref: String,
    /// Caller's prompt document, rendered by [`render_prompt`].
    pub prompt: serde_json::Value,
}

/// Why a page failed. The `Display` text is what pollers see.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid prompt: {0}")]
    Prompt(CoreError),

    #[error("failed to fetch {field} image: {source}")]
    Fetch {
        field: &'static str,
        source: CapabilityError,
    },

    #[error("{field} image could not be decoded: {source}")]
    Decode {
        field: &'static str,
        source: image::ImageError,
    },

    #[error("face masking failed: {0}")]
    Masking(CapabilityError),

    #[error("image synthesis failed: {0}")]
    Synthesis(CapabilityError),

    #[error("failed to store result: {0}")]
    Store(CapabilityError),

    #[error("{step} timed out after {}s", after.as_secs())]
    Timeout { step: &'static str, after: Duration },

    #[error("image conversion task failed: {0}")]
    Conversion(String),
}

/// The external capabilities a pipeline calls out to.
#[derive(Clone)]
pub struct Capabilities {
    pub fetcher: Arc<dyn ImageFetcher>,
    /// Masking is skipped when `None`.
    pub masker: Option<Arc<dyn FaceMasker>>,
    pub synthesizer: Arc<dyn ImageSynthesizer>,
    pub store: Arc<dyn DurableStore>,
}

/// Tunables for [`PagePipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bound on each fetch, mask, synthesis and store call.
    pub call_timeout: Duration,
    pub synthesis: SynthesisOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            synthesis: SynthesisOptions::default(),
        }
    }
}

/// Drives pages through fetch, normalise, mask, synthesize and store, and
/// records each state change in the [`JobRegistry`].
pub struct PagePipeline {
    registry: Arc<JobRegistry>,
    capabilities: Capabilities,
    config: PipelineConfig,
}

impl PagePipeline {
    pub fn new(registry: Arc<JobRegistry>, capabilities: Capabilities, config: PipelineConfig) -> Self {
        Self {
            registry,
            capabilities,
            config,
        }
    }

    /// Process one page to a terminal state.
    ///
    /// A page that can no longer move to `Processing` (it already reached a
    /// terminal state) is left alone and no external call is made.
    pub async fn run(&self, job: PageJob) {
        if let Err(CoreError::Conflict(_)) = self.record(&job, PageState::Processing) {
            return;
        }

        let outcome = AssertUnwindSafe(self.execute(&job)).catch_unwind().await;
        let next = match outcome {
            Ok(Ok(url)) => {
                tracing::info!(
                    process_id = %job.process_id,
                    page_id = %job.page_id,
                    %url,
                    "Page completed",
                );
                PageState::Completed { url }
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    process_id = %job.process_id,
                    page_id = %job.page_id,
                    error = %e,
                    "Page failed",
                );
                PageState::Failed {
                    error: e.to_string(),
                }
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(
                    process_id = %job.process_id,
                    page_id = %job.page_id,
                    panic = %message,
                    "Page pipeline panicked",
                );
                PageState::Failed {
                    error: format!("internal error: {message}"),
                }
            }
        };

        let _ = self.record(&job, next);
    }

    /// The fallible part of [`run`](Self::run). Returns the result URL.
    async fn execute(&self, job: &PageJob) -> Result<String, PipelineError> {
        let prompt = render_prompt(&job.prompt).map_err(PipelineError::Prompt)?;

        let (source, target) = tokio::try_join!(
            self.fetch("source", &job.source_ref),
            self.fetch("target", &job.target_ref),
        )?;
        let (source, target) = normalise(source, target).await?;

        let masked_source = match &self.capabilities.masker {
            Some(masker) => Some(
                self.bounded("face masking", masker.mask(&source), PipelineError::Masking)
                    .await?,
            ),
            None => None,
        };

        let request = EditRequest {
            source,
            masked_source,
            target,
            prompt,
            options: self.config.synthesis.clone(),
        };
        let result = self
            .bounded(
                "image synthesis",
                self.capabilities.synthesizer.edit(request),
                PipelineError::Synthesis,
            )
            .await?;

        let name = format!(
            "p_{}_{}_result.{}",
            job.page_id,
            uuid::Uuid::new_v4(),
            extension_for(&result),
        );
        self.bounded(
            "result upload",
            self.capabilities.store.save(result, &name),
            PipelineError::Store,
        )
        .await
    }

    async fn fetch(&self, field: &'static str, reference: &str) -> Result<Vec<u8>, PipelineError> {
        self.bounded(
            "image fetch",
            self.capabilities.fetcher.resolve(reference),
            |source| PipelineError::Fetch { field, source },
        )
        .await
    }

    /// Await an external call, bounded by the configured call timeout.
    async fn bounded<T, F>(
        &self,
        step: &'static str,
        call: F,
        wrap: impl FnOnce(CapabilityError) -> PipelineError,
    ) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, CapabilityError>>,
    {
        let after = self.config.call_timeout;
        match tokio::time::timeout(after, call).await {
            Ok(result) => result.map_err(wrap),
            Err(_) => Err(PipelineError::Timeout { step, after }),
        }
    }

    /// Record a transition. Failures are logged and handed back.
    fn record(&self, job: &PageJob, state: PageState) -> Result<(), CoreError> {
        self.registry
            .transition(job.process_id, job.page_id, state)
            .inspect_err(|e| {
                tracing::warn!(
                    process_id = %job.process_id,
                    page_id = %job.page_id,
                    error = %e,
                    "Failed to record page transition",
                );
            })
    }
}

/// Convert both inputs to RGBA PNG off the async workers.
async fn normalise(source: Vec<u8>, target: Vec<u8>) -> Result<(Vec<u8>, Vec<u8>), PipelineError> {
    tokio::task::spawn_blocking(move || {
        let source = to_rgba_png(&source).map_err(|source| PipelineError::Decode {
            field: "source",
            source,
        })?;
        let target = to_rgba_png(&target).map_err(|source| PipelineError::Decode {
            field: "target",
            source,
        })?;
        Ok((source, target))
    })
    .await
    .map_err(|e| PipelineError::Conversion(e.to_string()))?
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
