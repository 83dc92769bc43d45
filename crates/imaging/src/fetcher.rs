//! Resolves image references from the page payload to bytes.
//!
//! A reference is one of:
//! - an `http(s)` URL pointing back at this service's `/uploads/` path,
//!   read straight from local storage;
//! - any other `http(s)` URL, downloaded;
//! - a storage-relative path such as `a.png` or `storage/uploads/a.png`.

use std::time::Duration;

use async_trait::async_trait;
use taleify_jobs::capability::{CapabilityError, ImageFetcher};

use crate::storage::LocalDiskStore;
use crate::{ensure_success, transport};

const UPLOADS_SEGMENT: &str = "/uploads/";

pub struct StorageFetcher {
    store: LocalDiskStore,
    client: reqwest::Client,
}

impl StorageFetcher {
    /// `timeout` bounds each remote download.
    pub fn new(store: LocalDiskStore, timeout: Duration) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self { store, client })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, CapabilityError> {
        tracing::debug!(%url, "Downloading image");
        let response = self.client.get(url).send().await.map_err(transport)?;
        let response = ensure_success(response).await.map_err(|e| match e {
            CapabilityError::Service { status: 404, .. } => {
                CapabilityError::NotFound(format!("image not found at {url}"))
            }
            other => other,
        })?;
        let bytes = response.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageFetcher for StorageFetcher {
    async fn resolve(&self, reference: &str) -> Result<Vec<u8>, CapabilityError> {
        let reference = reference.trim();

        if reference.starts_with("http://") || reference.starts_with("https://") {
            return match local_name(reference) {
                Some(name) => self.store.read(name).await,
                None => self.download(reference).await,
            };
        }

        let relative = reference
            .trim_start_matches('/')
            .trim_start_matches("storage/uploads/");
        self.store.read(relative).await
    }
}

/// File name of a URL served from this service's uploads directory.
fn local_name(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once(UPLOADS_SEGMENT)?;
    let name = rest.split(['?', '#']).next().unwrap_or(rest);
    (!name.is_empty()).then_some(name)
}
