//! Binary object storage
//!
//! Contributions reference their media by URL or bucket-relative path. The
//! export pipeline fetches payloads through [`MediaStorage`]; deleting a
//! contribution removes its payload through the same trait.
//!
//! A reference is only ever resolved to an object inside the configured
//! bucket. Absolute URLs pointing anywhere else are refused, never requested.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use memento_common::config::{MediaBackend, MediaConfig};
use memento_common::{Error, Result};
use reqwest::StatusCode;
use tracing::debug;

/// Read and delete access to stored media payloads
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Bucket path of a reference this storage serves, `None` for anything else
    fn object_path<'a>(&self, reference: &'a str) -> Option<&'a str>;

    /// Download a payload; failures are [`Error::Transient`]
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>>;

    /// Delete a payload; deleting something already gone succeeds
    async fn remove(&self, reference: &str) -> Result<()>;
}

fn is_absolute_url(reference: &str) -> bool {
    reference.contains("://")
}

/// Non-empty relative path without dot segments (plain or percent-encoded)
fn clean_object_path(path: &str) -> Option<&str> {
    let path = path.trim_start_matches('/');
    let valid = !path.is_empty()
        && path.split('/').all(|segment| {
            let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
            !segment.is_empty() && decoded != "." && decoded != ".." && !segment.contains('\\')
        });
    valid.then_some(path)
}

/// Bucket-relative object path of a payload reference
///
/// Accepts `<bucket>/<path>`, bare paths and public URLs of the form
/// `https://host/.../<bucket>/<event>/<file>`. Query strings are dropped.
/// Absolute URLs without a `/<bucket>/` segment have no object path.
pub fn object_path<'a>(reference: &'a str, bucket: &str) -> Option<&'a str> {
    let reference = reference.trim().split(['?', '#']).next().unwrap_or_default();
    if is_absolute_url(reference) {
        let marker = format!("/{}/", bucket);
        let pos = reference.find(&marker)?;
        return clean_object_path(&reference[pos + marker.len()..]);
    }
    let relative = reference.trim_start_matches('/');
    let prefix = format!("{}/", bucket);
    clean_object_path(relative.strip_prefix(prefix.as_str()).unwrap_or(relative))
}

fn outside_bucket(reference: &str) -> Error {
    Error::InvalidInput(format!("Media reference outside bucket: {}", reference))
}

/// Build the storage backend named in the configuration
pub fn from_config(config: &MediaConfig, media_root: &Path) -> Result<Arc<dyn MediaStorage>> {
    match config.backend {
        MediaBackend::Local => Ok(Arc::new(LocalMediaStorage::new(
            media_root.join(&config.bucket),
            &config.bucket,
        ))),
        MediaBackend::Http => {
            let base_url = config.public_base_url.as_deref().ok_or_else(|| {
                Error::Config("media.public_base_url is required for the http backend".to_string())
            })?;
            Ok(Arc::new(HttpMediaStorage::new(
                base_url,
                &config.bucket,
                Duration::from_secs(config.fetch_timeout_secs),
            )?))
        }
    }
}

// ============================================================================
// Local filesystem
// ============================================================================

/// Payloads stored as files under one bucket directory
pub struct LocalMediaStorage {
    bucket_dir: PathBuf,
    bucket: String,
}

impl LocalMediaStorage {
    pub fn new(bucket_dir: PathBuf, bucket: &str) -> Self {
        Self {
            bucket_dir,
            bucket: bucket.to_string(),
        }
    }

    /// Map a reference to a file inside the bucket directory
    ///
    /// Absolute paths and `..` components are refused.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let path = Path::new(self.object_path(reference).ok_or_else(|| outside_bucket(reference))?);
        if !path.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(outside_bucket(reference));
        }
        Ok(self.bucket_dir.join(path))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    fn object_path<'a>(&self, reference: &'a str) -> Option<&'a str> {
        object_path(reference, &self.bucket)
    }

    async fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        let path = self.resolve(reference)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Transient(format!("Failed to read {}: {}", path.display(), e)))
    }

    async fn remove(&self, reference: &str) -> Result<()> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed media file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Transient(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

// ============================================================================
// HTTP object storage
// ============================================================================

/// Payloads served by an object store over HTTP
pub struct HttpMediaStorage {
    client: reqwest::Client,
    /// `<base_url>/<bucket>/`
    bucket_url: String,
    bucket: String,
}

impl HttpMediaStorage {
    pub fn new(base_url: &str, bucket: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            bucket_url: format!("{}/{}/", base_url.trim_end_matches('/'), bucket),
            bucket: bucket.to_string(),
        })
    }

    /// Absolute URL of a payload, always below the bucket URL
    pub fn url_for(&self, reference: &str) -> Result<String> {
        self.object_path(reference)
            .map(|path| format!("{}{}", self.bucket_url, path))
            .ok_or_else(|| outside_bucket(reference))
    }
}

#[async_trait]
impl MediaStorage for HttpMediaStorage {
    /// Relative references, or absolute URLs under the bucket URL
    fn object_path<'a>(&self, reference: &'a str) -> Option<&'a str> {
        let reference = reference.trim();
        if is_absolute_url(reference) {
            let path = reference.strip_prefix(self.bucket_url.as_str())?;
            return clean_object_path(path.split(['?', '#']).next().unwrap_or_default());
        }
        object_path(reference, &self.bucket)
    }

    async fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        let url = self.url_for(reference)?;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Transient(format!("Failed to fetch {}: {}", url, e)))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transient(format!("Failed to read {}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }

    async fn remove(&self, reference: &str) -> Result<()> {
        let url = self.url_for(reference)?;
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("Failed to delete {}: {}", url, e)))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        response
            .error_for_status()
            .map(|_| ())
            .map_err(|e| Error::Transient(format!("Failed to delete {}: {}", url, e)))
    }
}
