//! The job-tracking surface exposed to the HTTP layer.

use std::sync::Arc;

use serde::Serialize;
use taleify_core::error::CoreError;
use taleify_core::page::PageStatus;
use taleify_core::prompt::render_prompt;
use taleify_core::types::{PageId, ProcessId};
use taleify_core::validation::validate_image_ref;
use tracing::Instrument;

use crate::pipeline::{PageJob, PagePipeline};
use crate::registry::JobRegistry;
use crate::runner::TaskRunner;
use crate::status;

/// Input for one page submission.
#[derive(Debug, Clone)]
pub struct SubmitPage {
    pub source_ref: String,
    pub target_ref: String,
    pub prompt: serde_json::Value,
}

/// Snapshot of the process cache for operators.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub current_size: usize,
    pub max_size: usize,
    pub ttl_secs: u64,
    pub entries: Vec<CachedProcess>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CachedProcess {
    pub process_id: ProcessId,
    pub pages: usize,
    pub ttl_remaining_secs: u64,
}

/// Registers processes and pages and schedules page pipelines.
#[derive(Clone)]
pub struct JobService {
    registry: Arc<JobRegistry>,
    pipeline: Arc<PagePipeline>,
    runner: TaskRunner,
}

impl JobService {
    pub fn new(registry: Arc<JobRegistry>, pipeline: Arc<PagePipeline>, runner: TaskRunner) -> Self {
        Self {
            registry,
            pipeline,
            runner,
        }
    }

    pub fn initiate(&self) -> Result<ProcessId, CoreError> {
        self.registry.initiate()
    }

    /// Validate the page, register it as pending and schedule its pipeline.
    ///
    /// Returns as soon as the page is recorded; processing happens in the
    /// background.
    pub fn submit_page(&self, process_id: ProcessId, page: SubmitPage) -> Result<PageStatus, CoreError> {
        validate_image_ref("source_url", &page.source_ref)?;
        validate_image_ref("target_url", &page.target_ref)?;
        render_prompt(&page.prompt)?;

        let page_id: PageId = uuid::Uuid::new_v4();
        let entry = self.registry.submit_page(process_id, page_id)?;

        let job = PageJob {
            process_id,
            page_id,
            source_ref: page.source_ref.trim().to_string(),
            target_ref: page.target_ref.trim().to_string(),
            prompt: page.prompt,
        };
        let pipeline = Arc::clone(&self.pipeline);
        let span = tracing::info_span!("page_pipeline", %process_id, %page_id);
        self.runner
            .schedule("page_pipeline", async move { pipeline.run(job).await }.instrument(span));

        tracing::info!(%process_id, %page_id, "Page submitted");
        Ok(PageStatus::from_entry(process_id, page_id, &entry))
    }

    pub fn get_status(
        &self,
        process_id: ProcessId,
        page_id: Option<PageId>,
    ) -> Result<Vec<PageStatus>, CoreError> {
        status::get_status(&self.registry, process_id, page_id)
    }

    pub fn cache_status(&self) -> CacheStatus {
        let cache = self.registry.cache();
        let entries: Vec<CachedProcess> = cache
            .entries()
            .into_iter()
            .map(|live| CachedProcess {
                process_id: live.key,
                pages: live.value.len(),
                ttl_remaining_secs: live.ttl_remaining.as_secs(),
            })
            .collect();
        CacheStatus {
            current_size: entries.len(),
            max_size: cache.capacity(),
            ttl_secs: self.registry.ttl().as_secs(),
            entries,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }
}
