//! Speech-to-text client
//!
//! Two request styles are supported: uploading the audio bytes directly, or
//! sending a presigned URL that the backend fetches itself.

use crate::config::{TranscriptionConfig, TranscriptionMode};
use crate::storage::{MediaStore, StorageError, PRESIGN_TTL};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("recall-eval/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Failed to read audio: {0}")]
    Storage(#[from] StorageError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Speech backend timed out")]
    Timeout,

    #[error("Speech backend error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Speech backend returned no text")]
    EmptyText,
}

impl From<reqwest::Error> for TranscriptionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscriptionError::Timeout
        } else {
            TranscriptionError::Network(e.to_string())
        }
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio object stored under `storage_key`
    async fn transcribe(&self, storage_key: &str) -> Result<String, TranscriptionError>;
}

/// Body of a presigned-URL recognition request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UrlRecognitionRequest<'a> {
    url: &'a str,
    language: &'a str,
    completion: &'a str,
    media_format: &'a str,
    ignore_punctuation: bool,
}

pub struct SpeechClient {
    http_client: reqwest::Client,
    store: Arc<dyn MediaStore>,
    config: TranscriptionConfig,
}

impl SpeechClient {
    pub fn new(config: TranscriptionConfig, store: Arc<dyn MediaStore>) -> Result<Self, TranscriptionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| TranscriptionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            store,
            config,
        })
    }

    async fn send_binary(&self, storage_key: &str) -> Result<reqwest::Response, TranscriptionError> {
        let audio = self.store.get(storage_key).await?;
        debug!(storage_key = %storage_key, size = audio.len(), "Sending audio to speech backend");

        Ok(self
            .http_client
            .post(&self.config.endpoint)
            .query(&[("lang", self.config.language.as_str())])
            .header("X-NCP-APIGW-API-KEY-ID", &self.config.client_id)
            .header("X-NCP-APIGW-API-KEY", &self.config.client_secret)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(audio)
            .send()
            .await?)
    }

    async fn send_presigned(&self, storage_key: &str) -> Result<reqwest::Response, TranscriptionError> {
        let url = self
            .store
            .presign(storage_key, content_type_for_key(storage_key), PRESIGN_TTL)
            .await?;
        debug!(storage_key = %storage_key, "Sending presigned URL to speech backend");

        let body = UrlRecognitionRequest {
            url: &url,
            language: &self.config.language,
            completion: "sync",
            media_format: &self.config.media_format,
            ignore_punctuation: self.config.ignore_punctuation,
        };

        Ok(self
            .http_client
            .post(format!("{}/recognizer/url", self.config.endpoint.trim_end_matches('/')))
            .header("X-CLOVASPEECH-API-KEY", &self.config.client_secret)
            .json(&body)
            .send()
            .await?)
    }
}

#[async_trait]
impl Transcriber for SpeechClient {
    async fn transcribe(&self, storage_key: &str) -> Result<String, TranscriptionError> {
        let response = match self.config.mode {
            TranscriptionMode::Binary => self.send_binary(storage_key).await?,
            TranscriptionMode::PresignedUrl => self.send_presigned(storage_key).await?,
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Api(status.as_u16(), error_text));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| TranscriptionError::Parse(e.to_string()))?;

        let text = extract_text(&json).ok_or(TranscriptionError::EmptyText)?;
        info!(storage_key = %storage_key, chars = text.chars().count(), "Transcription complete");
        Ok(text)
    }
}

/// First non-empty `text` string, top level first, then depth-first
pub fn extract_text(json: &Value) -> Option<String> {
    if let Some(text) = json.get("text").and_then(Value::as_str) {
        let text = text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    match json {
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| key.as_str() != "text")
            .find_map(|(_, value)| extract_text(value)),
        Value::Array(items) => items.iter().find_map(extract_text),
        _ => None,
    }
}

fn content_type_for_key(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}
