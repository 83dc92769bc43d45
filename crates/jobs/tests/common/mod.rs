//! Shared fakes and helpers for job-service integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use taleify_core::page::{PageStatus, StatusKind};
use taleify_core::types::{PageId, ProcessId};
use taleify_jobs::capability::{
    CapabilityError, DurableStore, EditRequest, ImageFetcher, ImageSynthesizer,
};
use taleify_jobs::pipeline::{Capabilities, PagePipeline, PipelineConfig};
use taleify_jobs::registry::JobRegistry;
use taleify_jobs::runner::TaskRunner;
use taleify_jobs::service::JobService;

/// Prompt text that makes [`FakeSynthesizer`] fail.
pub const FAILING_PROMPT: &str = "please fail";

pub fn png() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Resolves every reference to a small PNG.
pub struct FakeFetcher;

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn resolve(&self, _reference: &str) -> Result<Vec<u8>, CapabilityError> {
        Ok(png())
    }
}

/// Succeeds after a short delay unless the prompt is [`FAILING_PROMPT`].
pub struct FakeSynthesizer {
    pub delay: Duration,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ImageSynthesizer for FakeSynthesizer {
    async fn edit(&self, request: EditRequest) -> Result<Vec<u8>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if request.prompt == FAILING_PROMPT {
            return Err(CapabilityError::Service {
                status: 502,
                body: "synthesis backend unavailable".into(),
            });
        }
        Ok(png())
    }
}

/// Pretends to store results and returns a predictable URL.
pub struct FakeStore;

#[async_trait]
impl DurableStore for FakeStore {
    async fn save(&self, _bytes: Vec<u8>, name: &str) -> Result<String, CapabilityError> {
        Ok(format!("http://test.local/storage/uploads/{name}"))
    }
}

pub struct TestJobs {
    pub service: JobService,
    pub synthesizer: Arc<FakeSynthesizer>,
}

pub fn build_service(ttl: Duration) -> TestJobs {
    let registry = Arc::new(JobRegistry::new(100, ttl));
    let synthesizer = Arc::new(FakeSynthesizer {
        delay: Duration::from_millis(20),
        calls: AtomicUsize::new(0),
    });
    let capabilities = Capabilities {
        fetcher: Arc::new(FakeFetcher),
        masker: None,
        synthesizer: synthesizer.clone(),
        store: Arc::new(FakeStore),
    };
    let pipeline = Arc::new(PagePipeline::new(
        Arc::clone(&registry),
        capabilities,
        PipelineConfig::default(),
    ));
    TestJobs {
        service: JobService::new(registry, pipeline, TaskRunner::new()),
        synthesizer,
    }
}

/// Poll until the page reaches a terminal state, recording every distinct
/// status observed along the way.
pub async fn poll_until_terminal(
    service: &JobService,
    process_id: ProcessId,
    page_id: PageId,
) -> (PageStatus, Vec<StatusKind>) {
    let mut seen: Vec<StatusKind> = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let status = service
            .get_status(process_id, Some(page_id))
            .unwrap()
            .remove(0);
        if seen.last() != Some(&status.status) {
            seen.push(status.status);
        }
        if matches!(status.status, StatusKind::Completed | StatusKind::Failed) {
            return (status, seen);
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "page {page_id} never reached a terminal state, saw {seen:?}"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
