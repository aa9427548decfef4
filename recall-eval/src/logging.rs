//! Subscriber setup
//!
//! The subscriber goes in before configuration is read so that loading and
//! validation can log. `RUST_LOG` wins when set; otherwise logging starts at
//! `info` and switches to `logging.level` once the configuration is known.

use crate::config::LoggingConfig;
use recall_common::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used until the configuration is loaded
pub const STARTUP_FILTER: &str = "info";

/// Handle for swapping in the configured filter
pub struct FilterHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

/// Reloadable filter layer, seeded from `env` when given
pub fn reloadable_filter(env: Option<EnvFilter>) -> (reload::Layer<EnvFilter, Registry>, FilterHandle) {
    let from_env = env.is_some();
    let (layer, handle) = reload::Layer::new(env.unwrap_or_else(|| EnvFilter::new(STARTUP_FILTER)));
    (layer, FilterHandle { handle, from_env })
}

/// Install the global subscriber
pub fn init() -> FilterHandle {
    let (filter, handle) = reloadable_filter(EnvFilter::try_from_default_env().ok());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    handle
}

impl FilterHandle {
    /// Apply the configured level unless `RUST_LOG` chose the filter
    pub fn apply(&self, config: &LoggingConfig) -> Result<()> {
        if self.from_env {
            return Ok(());
        }
        self.handle
            .reload(config.env_filter()?)
            .map_err(|e| Error::Config(format!("Failed to apply logging.level: {}", e)))
    }
}
