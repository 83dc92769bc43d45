//! Local-disk file store behind `/storage/uploads`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use taleify_jobs::capability::{CapabilityError, DurableStore};

/// URL path under which stored files are served.
pub const PUBLIC_PREFIX: &str = "/storage/uploads";

/// Writes files into a single directory and builds their public URLs.
#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    dir: PathBuf,
    app_url: String,
}

impl LocalDiskStore {
    /// * `dir` - Directory holding uploads and results.
    /// * `app_url` - Public base URL, e.g. `http://localhost:8000`.
    pub fn new(dir: impl Into<PathBuf>, app_url: &str) -> Self {
        Self {
            dir: dir.into(),
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the storage directory if it does not exist.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Public URL of a stored file.
    pub fn public_url(&self, name: &str) -> String {
        format!("{}{PUBLIC_PREFIX}/{name}", self.app_url)
    }

    /// Path of a stored file as reported to clients (`storage/uploads/{name}`).
    pub fn relative_path(&self, name: &str) -> String {
        format!("{}/{name}", PUBLIC_PREFIX.trim_start_matches('/'))
    }

    /// Resolve a storage-relative reference to a path inside the directory.
    ///
    /// Absolute paths and any `..` component are rejected.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, CapabilityError> {
        let relative = relative.trim_start_matches("./");
        let path = Path::new(relative);
        let clean = !relative.is_empty()
            && path
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !clean {
            return Err(CapabilityError::NotFound(format!(
                "invalid storage path: {relative}"
            )));
        }
        Ok(self.dir.join(path))
    }

    /// Read a stored file.
    pub async fn read(&self, relative: &str) -> Result<Vec<u8>, CapabilityError> {
        let path = self.resolve(relative)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CapabilityError::NotFound(
                format!("image file not found: {relative}"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `bytes` under `name`, returning the public URL.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<String, CapabilityError> {
        if name.contains('/') || name.contains('\\') {
            return Err(CapabilityError::Processing(format!(
                "invalid file name: {name}"
            )));
        }
        let path = self.resolve(name)?;
        self.ensure_dir().await?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "File stored");
        Ok(self.public_url(name))
    }
}

#[async_trait]
impl DurableStore for LocalDiskStore {
    async fn save(&self, bytes: Vec<u8>, suggested_name: &str) -> Result<String, CapabilityError> {
        self.write(suggested_name, &bytes).await
    }
}
