//! Service configuration
//!
//! Loaded from a TOML bootstrap file resolved by
//! [`recall_common::config::resolve_config_file`]; secrets may be supplied
//! through `RECALL_*` environment variables instead of the file.

use chrono::FixedOffset;
use recall_common::config::{default_data_dir, env_override, load_toml, resolve_config_file, CONFIG_ENV_VAR};
use recall_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub const ENV_JUDGE_API_KEY: &str = "RECALL_JUDGE_API_KEY";
pub const ENV_STT_CLIENT_ID: &str = "RECALL_STT_CLIENT_ID";
pub const ENV_STT_CLIENT_SECRET: &str = "RECALL_STT_CLIENT_SECRET";
pub const ENV_STORAGE_SIGNING_SECRET: &str = "RECALL_STORAGE_SIGNING_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub database_path: PathBuf,
    pub bind_addr: String,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub transcoder: TranscoderConfig,
    pub transcription: TranscriptionConfig,
    pub judge: JudgeConfig,
    pub pipeline: PipelineConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Bare level (`info`, `debug`, ...) applied to the service crates, or a
    /// full `EnvFilter` directive list such as `recall_eval=debug,sqlx=warn`
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub bucket: String,
    /// Leading key segment, may be empty
    pub prefix: String,
    pub public_base_url: String,
    pub signing_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    pub program: String,
    pub scratch_dir: PathBuf,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptionMode {
    /// Upload the audio bytes
    Binary,
    /// Send a presigned URL and let the backend fetch the object
    PresignedUrl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub mode: TranscriptionMode,
    pub endpoint: String,
    pub language: String,
    pub client_id: String,
    /// API key; in presigned-url mode sent as the invoke key
    pub client_secret: String,
    pub media_format: String,
    pub ignore_punctuation: bool,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub enqueue_timeout_ms: u64,
    pub event_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Fixed offset defining "today", e.g. `+09:00`
    pub utc_offset: String,
    pub enabled: bool,
    /// Local hour at which personalized questions are generated
    pub personal_generation_hour: u32,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            database_path: default_data_dir().join("recall.db"),
            bind_addr: "127.0.0.1:5740".to_string(),
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            transcoder: TranscoderConfig::default(),
            transcription: TranscriptionConfig::default(),
            judge: JudgeConfig::default(),
            pipeline: PipelineConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_data_dir().join("media"),
            bucket: "recall-media".to_string(),
            prefix: String::new(),
            public_base_url: "http://127.0.0.1:5740/media".to_string(),
            signing_secret: String::new(),
        }
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            scratch_dir: std::env::temp_dir().join("recall-scratch"),
            timeout_secs: 60,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            mode: TranscriptionMode::Binary,
            endpoint: "https://naveropenapi.apigw.ntruss.com/recog/v1/stt".to_string(),
            language: "Kor".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            media_format: "wav".to_string(),
            ignore_punctuation: false,
            timeout_secs: 30,
        }
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: String::new(),
            requests_per_minute: 60,
            timeout_secs: 30,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 64,
            enqueue_timeout_ms: 500,
            event_capacity: 256,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset: "+09:00".to_string(),
            enabled: true,
            personal_generation_hour: 21,
        }
    }
}

impl EvalConfig {
    /// Resolve, load, apply environment overrides and validate
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = resolve_config_file(cli_path, CONFIG_ENV_VAR)?;
        match &path {
            Some(path) => info!("Loading configuration from {}", path.display()),
            None => info!("No configuration file found, using defaults"),
        }

        let mut config: EvalConfig = load_toml(path.as_deref())?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Replace secrets with values from `RECALL_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        override_secret(&mut self.judge.api_key, ENV_JUDGE_API_KEY, "judge.api_key");
        override_secret(&mut self.transcription.client_id, ENV_STT_CLIENT_ID, "transcription.client_id");
        override_secret(
            &mut self.transcription.client_secret,
            ENV_STT_CLIENT_SECRET,
            "transcription.client_secret",
        );
        override_secret(
            &mut self.storage.signing_secret,
            ENV_STORAGE_SIGNING_SECRET,
            "storage.signing_secret",
        );
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("Invalid bind_addr '{}': {}", self.bind_addr, e)))?;

        if self.pipeline.workers == 0 {
            return Err(Error::Config("pipeline.workers must be at least 1".to_string()));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(Error::Config("pipeline.queue_capacity must be at least 1".to_string()));
        }
        for (key, secs) in [
            ("transcoder.timeout_secs", self.transcoder.timeout_secs),
            ("transcription.timeout_secs", self.transcription.timeout_secs),
            ("judge.timeout_secs", self.judge.timeout_secs),
        ] {
            if secs == 0 {
                return Err(Error::Config(format!("{} must be at least 1", key)));
            }
        }
        if self.judge.requests_per_minute == 0 {
            return Err(Error::Config("judge.requests_per_minute must be at least 1".to_string()));
        }
        if self.schedule.personal_generation_hour > 23 {
            return Err(Error::Config(format!(
                "schedule.personal_generation_hour must be 0-23, got {}",
                self.schedule.personal_generation_hour
            )));
        }
        if self.storage.bucket.is_empty() || self.storage.bucket.contains('/') {
            return Err(Error::Config(format!("Invalid storage.bucket '{}'", self.storage.bucket)));
        }
        self.utc_offset()?;
        self.logging.env_filter()?;

        if self.storage.signing_secret.is_empty() {
            warn!("storage.signing_secret is empty; presigned URLs are trivially forgeable");
        }
        if self.judge.api_key.is_empty() {
            warn!("judge.api_key is not configured; scoring will fail");
        }

        Ok(())
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        recall_common::time::parse_utc_offset(&self.schedule.utc_offset)
    }
}

impl LoggingConfig {
    /// Filter directives for the subscriber
    pub fn directives(&self) -> String {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            level.to_string()
        } else {
            format!("recall_eval={level},recall_common={level},tower_http=info")
        }
    }

    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(self.directives())
            .map_err(|e| Error::Config(format!("Invalid logging.level '{}': {}", self.level, e)))
    }
}

impl TranscoderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TranscriptionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl JudgeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PipelineConfig {
    pub fn enqueue_timeout(&self) -> Duration {
        recall_common::time::millis_to_duration(self.enqueue_timeout_ms)
    }
}

fn override_secret(slot: &mut String, env_name: &str, key: &str) {
    if let Some(value) = env_override(env_name) {
        if !slot.trim().is_empty() {
            warn!("{} set in both TOML and {}; using environment", key, env_name);
        }
        *slot = value;
    }
}
