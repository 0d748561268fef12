mod local;
#[cfg(feature = "s3")]
mod s3;

pub use local::LocalStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Internal(String),
}

/// Blob storage for ticket images, keyed by slash-separated paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write (create or overwrite) an object.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError>;

    /// Read an object. Returns `StoreError::NotFound` if absent.
    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Delete an object. No-op if absent.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// URL a client can fetch the object from.
    fn public_url(&self, key: &str) -> String;
}

// -- Key helpers --

/// Last path component of a client-supplied file name, or `None` when nothing
/// usable is left.
pub fn sanitize_filename(filename: &str) -> Option<&str> {
    let name = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

/// `tickets/<ticket_id>/<unix_millis>-<filename>`.
pub fn ticket_image_key(ticket_id: &str, unix_millis: i64, filename: &str) -> Option<String> {
    let name = sanitize_filename(filename)?;
    Some(format!("tickets/{ticket_id}/{unix_millis}-{name}"))
}

/// Keys are relative paths without `.` or `..` segments.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key.split('/').all(|seg| !matches!(seg, "" | "." | ".."))
}

pub fn content_type_for_key(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

// -- Configuration --

/// Configuration for the object store backend.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// S3-compatible endpoint URL. When `None`, use the local filesystem.
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Local base directory (used when S3 is not configured).
    pub local_data_dir: Option<String>,
    /// Prefix for public object URLs. For the local store this is the
    /// server's own address; for S3 it overrides the bucket URL.
    pub public_base_url: Option<String>,
}

impl StoreConfig {
    /// `BILHETES_S3_*` with `AWS_*` fallbacks. S3 is used only when endpoint,
    /// credentials and bucket are all present.
    pub fn from_env() -> Self {
        Self {
            endpoint_url: std::env::var("BILHETES_S3_ENDPOINT")
                .or_else(|_| std::env::var("AWS_ENDPOINT_URL"))
                .ok(),
            region: std::env::var("BILHETES_S3_REGION")
                .or_else(|_| std::env::var("AWS_REGION"))
                .ok(),
            bucket: std::env::var("BILHETES_S3_BUCKET").ok(),
            access_key_id: std::env::var("BILHETES_S3_ACCESS_KEY_ID")
                .or_else(|_| std::env::var("AWS_ACCESS_KEY_ID"))
                .ok(),
            secret_access_key: std::env::var("BILHETES_S3_SECRET_ACCESS_KEY")
                .or_else(|_| std::env::var("AWS_SECRET_ACCESS_KEY"))
                .ok(),
            local_data_dir: None,
            public_base_url: std::env::var("BILHETES_S3_PUBLIC_URL").ok(),
        }
    }

    pub fn is_s3(&self) -> bool {
        self.endpoint_url.is_some()
            && self.access_key_id.is_some()
            && self.secret_access_key.is_some()
            && self.bucket.is_some()
    }
}

/// `$XDG_DATA_HOME/bilhetes/objects`, mirroring `bilhetes_db::data_dir()`
/// without depending on the db crate.
pub fn default_objects_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local/share")
    } else {
        PathBuf::from(".")
    };
    base.join("bilhetes").join("objects")
}

// -- Factory --

pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
    if config.is_s3() {
        #[cfg(feature = "s3")]
        {
            tracing::info!(bucket = ?config.bucket, "using s3 object store");
            Ok(Arc::new(S3Store::new(config)?))
        }
        #[cfg(not(feature = "s3"))]
        {
            Err(StoreError::Internal(
                "S3 configuration detected but the 's3' feature is not enabled".into(),
            ))
        }
    } else {
        let store = LocalStore::new(config);
        tracing::info!(dir = %store.base_dir().display(), "using local object store");
        Ok(Arc::new(store))
    }
}
