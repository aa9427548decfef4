//! Object storage for uploaded media
//!
//! Objects are written once under slash-separated keys and never modified.

mod fs;

pub use fs::FsMediaStore;

use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

/// Presigned URLs handed to the speech backend and to clients
pub const PRESIGN_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Bucket objects are addressed under
    fn bucket(&self) -> &str;

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Time-limited URL granting read access to `key`
    async fn presign(&self, key: &str, content_type: &str, ttl: Duration) -> Result<String, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Normalize a stored object URL (or a bare key) to a key of this store
    fn to_storage_key(&self, url_or_key: &str) -> String {
        to_storage_key(url_or_key, self.bucket())
    }
}

/// Reject keys that could escape the bucket
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Strip scheme, host, bucket and query from an object URL
///
/// Anything that does not parse as an http(s) URL is treated as a key and
/// returned without its leading slash.
pub fn to_storage_key(url_or_key: &str, bucket: &str) -> String {
    let trimmed = url_or_key.trim();

    let path = match Url::parse(trimmed) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => url.path().to_string(),
        _ => return trimmed.trim_start_matches('/').to_string(),
    };

    let path = path.trim_start_matches('/');
    // Path-style URLs carry the bucket as the first segment; the public base
    // URL may add more segments before it.
    let bucket_segment = format!("{}/", bucket);
    match path.find(&bucket_segment) {
        Some(pos) if pos == 0 || path[..pos].ends_with('/') => {
            path[pos + bucket_segment.len()..].to_string()
        }
        _ => path.to_string(),
    }
}
