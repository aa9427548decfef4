//! Upload ingestion
//!
//! Stores the uploaded file and, for audio, a normalized WAV sibling.
//! Everything here runs before the submission is acknowledged, so any
//! failure is reported to the caller directly.

mod transcoder;

pub use transcoder::{FfmpegTranscoder, Transcoder};

use crate::domain::{Domain, MediaKind};
use crate::storage::{MediaStore, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Upload is empty")]
    EmptyUpload,

    #[error("Upload declared as {declared} but content looks like {detected}")]
    ContentMismatch { declared: MediaKind, detected: String },

    #[error("Transcoding failed: {0}")]
    Transcode(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("Scratch file IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// File received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: Option<String>, bytes: Vec<u8>) -> Self {
        Self { filename, bytes }
    }
}

/// Where an ingested upload ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    /// Key the rest of the pipeline reads (normalized WAV for audio)
    pub storage_key: String,
    /// Key of the upload as received
    pub media_path: String,
    pub media_kind: MediaKind,
}

pub struct MediaIngestor {
    store: Arc<dyn MediaStore>,
    transcoder: Arc<dyn Transcoder>,
    prefix: String,
    scratch_dir: PathBuf,
}

impl MediaIngestor {
    pub fn new(
        store: Arc<dyn MediaStore>,
        transcoder: Arc<dyn Transcoder>,
        prefix: impl Into<String>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            transcoder,
            prefix: prefix.into().trim_matches('/').to_string(),
            scratch_dir: scratch_dir.into(),
        }
    }

    pub async fn ingest(
        &self,
        upload: &Upload,
        domain: Domain,
        kind: MediaKind,
    ) -> Result<IngestReceipt, IngestError> {
        if upload.bytes.is_empty() {
            return Err(IngestError::EmptyUpload);
        }

        if kind == MediaKind::Image {
            if let Some(detected) = infer::get(&upload.bytes) {
                if detected.matcher_type() != infer::MatcherType::Image {
                    return Err(IngestError::ContentMismatch {
                        declared: kind,
                        detected: detected.mime_type().to_string(),
                    });
                }
            }
        }

        let (basename, extension) = split_filename(upload.filename.as_deref());
        let extension = extension.unwrap_or_else(|| sniff_extension(&upload.bytes));
        let stem = format!("{}_{}", Uuid::new_v4(), basename);
        let folder = domain.policy().folder;

        let raw_key = object_key(&self.prefix, folder, &stem, &extension);
        self.store.put(&raw_key, &upload.bytes).await?;

        if !kind.policy().transcode {
            info!(domain = %domain, storage_key = %raw_key, media_kind = %kind, "Stored upload");
            return Ok(IngestReceipt {
                storage_key: raw_key.clone(),
                media_path: raw_key,
                media_kind: kind,
            });
        }

        let normalized_stem = if extension == "wav" {
            format!("{}_16k", stem)
        } else {
            stem.clone()
        };
        let normalized_key = object_key(&self.prefix, folder, &normalized_stem, "wav");

        let normalized = match self.transcode(&upload.bytes, &stem, &extension).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(domain = %domain, media_path = %raw_key, error = %e, "Transcoding failed");
                return Err(e);
            }
        };
        self.store.put(&normalized_key, &normalized).await?;

        info!(
            domain = %domain,
            storage_key = %normalized_key,
            media_path = %raw_key,
            "Stored upload and normalized audio"
        );

        Ok(IngestReceipt {
            storage_key: normalized_key,
            media_path: raw_key,
            media_kind: kind,
        })
    }

    async fn transcode(&self, bytes: &[u8], stem: &str, extension: &str) -> Result<Vec<u8>, IngestError> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        let scratch = ScratchFiles {
            input: self.scratch_dir.join(format!("{}.in.{}", stem, extension)),
            output: self.scratch_dir.join(format!("{}.out.wav", stem)),
        };

        tokio::fs::write(&scratch.input, bytes).await?;
        self.transcoder.transcode(&scratch.input, &scratch.output).await?;
        let normalized = tokio::fs::read(&scratch.output).await?;

        debug!(size = normalized.len(), "Read normalized audio");
        Ok(normalized)
    }
}

/// Local temporaries, removed when dropped on every exit path
struct ScratchFiles {
    input: PathBuf,
    output: PathBuf,
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in [&self.input, &self.output] {
            remove_quietly(path);
        }
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
        }
    }
}

/// `{prefix}/{folder}/{stem}.{ext}`, without a leading segment for an empty prefix
pub fn object_key(prefix: &str, folder: &str, stem: &str, extension: &str) -> String {
    if prefix.is_empty() {
        format!("{}/{}.{}", folder, stem, extension)
    } else {
        format!("{}/{}/{}.{}", prefix, folder, stem, extension)
    }
}

/// Split an upload filename into a key-safe basename and lowercase extension
///
/// Directory components are dropped; a missing name yields a fresh uuid.
pub fn split_filename(filename: Option<&str>) -> (String, Option<String>) {
    let name = filename
        .map(|f| f.rsplit(['/', '\\']).next().unwrap_or(f).trim())
        .unwrap_or("");

    let (base, ext) = match name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && !ext.is_empty() => (base, Some(ext)),
        _ => (name, None),
    };

    let base = sanitize(base);
    let base = if base.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        base
    };

    let ext = ext
        .map(|e| sanitize(e).to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));

    (base, ext)
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

fn sniff_extension(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.extension().to_string())
        .unwrap_or_else(|| "bin".to_string())
}
