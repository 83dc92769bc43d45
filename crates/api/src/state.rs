use std::sync::Arc;

use taleify_imaging::fetcher::StorageFetcher;
use taleify_imaging::keywords::{KeywordGenerator, OpenAiKeywordGenerator};
use taleify_imaging::masking::HttpFaceMasker;
use taleify_imaging::openai::{OpenAiConfig, OpenAiError, OpenAiImageEditor};
use taleify_imaging::storage::LocalDiskStore;
use taleify_jobs::capability::{CapabilityError, FaceMasker, SynthesisOptions};
use taleify_jobs::pipeline::{Capabilities, PagePipeline, PipelineConfig};
use taleify_jobs::registry::JobRegistry;
use taleify_jobs::runner::TaskRunner;
use taleify_jobs::service::JobService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything inside is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Process registration, page scheduling and status reads.
    pub jobs: JobService,
    /// Upload directory, shared with the pipeline's result store.
    pub store: Arc<LocalDiskStore>,
    pub keywords: Arc<dyn KeywordGenerator>,
}

impl AppState {
    /// Wire the registry, runner and page pipeline around `capabilities`.
    pub fn new(
        config: ServerConfig,
        store: Arc<LocalDiskStore>,
        capabilities: Capabilities,
        keywords: Arc<dyn KeywordGenerator>,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new(
            config.jobs.cache_max_entries,
            config.jobs.process_ttl(),
        ));
        let pipeline_config = PipelineConfig {
            call_timeout: config.jobs.external_call_timeout(),
            synthesis: SynthesisOptions {
                model: config.jobs.synthesis_model.clone(),
                size: config.jobs.synthesis_size.clone(),
                quality: config.jobs.synthesis_quality.clone(),
            },
        };
        let pipeline = Arc::new(PagePipeline::new(
            Arc::clone(&registry),
            capabilities,
            pipeline_config,
        ));
        let jobs = JobService::new(registry, pipeline, TaskRunner::new());

        Self {
            config: Arc::new(config),
            jobs,
            store,
            keywords,
        }
    }
}

/// Failure to construct the production capability adapters.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("OpenAI client: {0}")]
    OpenAi(#[from] OpenAiError),

    #[error("image capability: {0}")]
    Capability(#[from] CapabilityError),
}

fn openai_config(config: &ServerConfig) -> OpenAiConfig {
    OpenAiConfig {
        api_key: config.jobs.openai_api_key.clone().unwrap_or_default(),
        base_url: config.jobs.openai_base_url.clone(),
        timeout: config.jobs.external_call_timeout(),
    }
}

/// Build the real adapters: local storage, OpenAI synthesis and the optional
/// HTTP face masker.
pub fn build_capabilities(
    config: &ServerConfig,
    store: Arc<LocalDiskStore>,
) -> Result<Capabilities, StartupError> {
    let timeout = config.jobs.external_call_timeout();

    let fetcher = StorageFetcher::new(store.as_ref().clone(), timeout)?;
    let synthesizer = OpenAiImageEditor::new(openai_config(config))?;
    let masker = match &config.jobs.face_masker_url {
        Some(url) => {
            tracing::info!(%url, "Face masking enabled");
            Some(Arc::new(HttpFaceMasker::new(url.clone(), timeout)?) as Arc<dyn FaceMasker>)
        }
        None => {
            tracing::info!("FACE_MASKER_URL not set, face masking disabled");
            None
        }
    };

    Ok(Capabilities {
        fetcher: Arc::new(fetcher),
        masker,
        synthesizer: Arc::new(synthesizer),
        store,
    })
}

/// Build the OpenAI-backed SEO keyword generator.
pub fn build_keyword_generator(
    config: &ServerConfig,
) -> Result<Arc<dyn KeywordGenerator>, StartupError> {
    let generator = OpenAiKeywordGenerator::new(openai_config(config), &config.jobs.keyword_model)?;
    Ok(Arc::new(generator))
}
