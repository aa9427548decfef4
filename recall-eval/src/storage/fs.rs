//! Filesystem-backed media store with signed URLs

use super::{validate_key, MediaStore, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Stores objects as files under `<root>/<bucket>/<key>`
#[derive(Debug, Clone)]
pub struct FsMediaStore {
    bucket_dir: PathBuf,
    bucket: String,
    public_base_url: String,
    signing_secret: String,
}

impl FsMediaStore {
    /// Open the store, creating the bucket directory if needed
    pub async fn open(
        root: &Path,
        bucket: &str,
        public_base_url: &str,
        signing_secret: &str,
    ) -> Result<Self, StorageError> {
        let bucket_dir = root.join(bucket);
        fs::create_dir_all(&bucket_dir).await?;

        Ok(Self {
            bucket_dir,
            bucket: bucket.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            signing_secret: signing_secret.to_string(),
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.bucket_dir.join(key))
    }

    fn signature(&self, key: &str, content_type: &str, expires: i64) -> String {
        let expires = expires.to_string();
        let mut hasher = Sha256::new();
        for part in [
            self.signing_secret.as_str(),
            self.bucket.as_str(),
            key,
            content_type,
            expires.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Check a presigned URL's signature and expiry against `now`
    pub fn verify(
        &self,
        key: &str,
        content_type: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if expires < now.timestamp() {
            return false;
        }
        let expected = self.signature(key, content_type, expires);
        expected.len() == signature.len()
            && expected
                .bytes()
                .zip(signature.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }

    /// Presign relative to an explicit clock
    pub fn presign_at(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        let expires = now.timestamp() + ttl.as_secs() as i64;
        let signature = self.signature(key, content_type, expires);

        let mut url = Url::parse(&format!("{}/{}/{}", self.public_base_url, self.bucket, key))
            .map_err(|e| StorageError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("content-type", content_type)
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &signature);

        Ok(url.to_string())
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        debug!(key = %key, size = bytes.len(), "Stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn presign(&self, key: &str, content_type: &str, ttl: Duration) -> Result<String, StorageError> {
        self.presign_at(key, content_type, ttl, Utc::now())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }
}
