#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;

use taleify_api::config::{JobsConfig, ServerConfig};
use taleify_api::router::build_app_router;
use taleify_api::state::AppState;
use taleify_imaging::fetcher::StorageFetcher;
use taleify_imaging::keywords::KeywordGenerator;
use taleify_imaging::openai::OpenAiError;
use taleify_imaging::storage::LocalDiskStore;
use taleify_jobs::capability::{CapabilityError, EditRequest, ImageSynthesizer};
use taleify_jobs::pipeline::Capabilities;

pub const TEST_API_KEY: &str = "test-key";

/// Prompt that makes [`FakeSynthesizer`] fail.
pub const FAILING_PROMPT: &str = "please fail";

/// Build a test `ServerConfig` with safe defaults, storing files in `dir`.
pub fn test_config(dir: &TempDir, api_key: Option<&str>) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        app_url: "http://test.local".to_string(),
        upload_dir: dir.path().to_path_buf(),
        api_key: api_key.map(str::to_string),
        jobs: JobsConfig {
            process_ttl_secs: 60,
            cache_max_entries: 100,
            sweep_interval_secs: 60,
            external_call_timeout_secs: 5,
            openai_api_key: None,
            openai_base_url: "http://openai.invalid".to_string(),
            synthesis_model: "gpt-image-1".to_string(),
            synthesis_size: "1024x1024".to_string(),
            synthesis_quality: "high".to_string(),
            face_masker_url: None,
            keyword_model: "gpt-4".to_string(),
        },
    }
}

/// Returns a PNG unless the prompt is [`FAILING_PROMPT`].
pub struct FakeSynthesizer;

#[async_trait]
impl ImageSynthesizer for FakeSynthesizer {
    async fn edit(&self, request: EditRequest) -> Result<Vec<u8>, CapabilityError> {
        if request.prompt == FAILING_PROMPT {
            return Err(CapabilityError::Service {
                status: 500,
                body: "synthesis exploded".into(),
            });
        }
        Ok(png())
    }
}

/// Description that makes [`FakeKeywords`] fail like an overloaded upstream.
pub const FAILING_DESCRIPTION: &str = "upstream down";

/// Echoes the trimmed description back as its second keyword.
pub struct FakeKeywords;

#[async_trait]
impl KeywordGenerator for FakeKeywords {
    async fn generate(&self, description: &str) -> Result<Vec<String>, OpenAiError> {
        if description == FAILING_DESCRIPTION {
            return Err(OpenAiError::Api {
                status: 503,
                body: "overloaded".into(),
            });
        }
        Ok(vec!["fairy tale".to_string(), description.to_string()])
    }
}

pub fn png() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::from_pixel(2, 2, Rgb([50, 60, 70]))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    /// Upload directory; removed when the app is dropped.
    pub dir: TempDir,
}

/// Build the full application router with all middleware layers.
///
/// Storage and fetching are the real local-disk adapters over a temp
/// directory; only synthesis is faked.
pub fn build_test_app(api_key: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir, api_key);

    let store = Arc::new(LocalDiskStore::new(dir.path(), &config.app_url));
    let capabilities = Capabilities {
        fetcher: Arc::new(
            StorageFetcher::new(store.as_ref().clone(), Duration::from_secs(5)).unwrap(),
        ),
        masker: None,
        synthesizer: Arc::new(FakeSynthesizer),
        store: store.clone(),
    };

    let state = AppState::new(config.clone(), store, capabilities, Arc::new(FakeKeywords));
    let router = build_app_router(state.clone(), &config);
    TestApp { router, state, dir }
}

impl TestApp {
    /// Place an input image in the upload directory.
    pub fn write_input(&self, name: &str) {
        std::fs::write(self.dir.path().join(name), png()).unwrap();
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        send(&self.router, Method::GET, uri, None, Some(TEST_API_KEY)).await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        send(&self.router, Method::POST, uri, Some(body), Some(TEST_API_KEY)).await
    }

    /// Initiate a process and return its id.
    pub async fn initiate(&self) -> String {
        let response = self
            .post_json("/api/v1/initiate-process", serde_json::json!({}))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"]["init_id"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    json: Option<serde_json::Value>,
    api_key: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    let body = match json {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Build a `multipart/form-data` body with a single file field.
pub fn multipart_body(field: &str, filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "taleify-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
