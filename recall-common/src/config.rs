//! Bootstrap configuration file resolution and loading

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RECALL_CONFIG";

/// Application directory name under the platform config/data dirs
pub const APP_DIR: &str = "recall";

/// Config file resolution following priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. `<config dir>/recall/config.toml` if it exists
/// 4. None (caller falls back to compiled defaults)
///
/// An explicitly named file (CLI or env) that does not exist is an error;
/// a missing platform default is not.
pub fn resolve_config_file(cli_arg: Option<&Path>, env_var_name: &str) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return require_existing(path.to_path_buf(), "--config");
    }

    // Priority 2: Environment variable
    if let Some(path) = env_override(env_var_name) {
        return require_existing(PathBuf::from(path), env_var_name);
    }

    // Priority 3: Platform config directory
    if let Some(path) = default_config_file() {
        if path.exists() {
            return Ok(Some(path));
        }
        debug!("No config file at {}", path.display());
    }

    Ok(None)
}

fn require_existing(path: PathBuf, source: &str) -> Result<Option<PathBuf>> {
    if path.is_file() {
        Ok(Some(path))
    } else {
        Err(Error::Config(format!(
            "Config file from {} not found: {}",
            source,
            path.display()
        )))
    }
}

/// Platform default config file path (`~/.config/recall/config.toml` on Linux)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// OS-dependent default data folder
pub fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/var/lib/recall"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/recall"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\recall"))
    } else {
        PathBuf::from("./recall_data")
    }
}

/// Parse a TOML document into `T`
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
}

/// Load `T` from the given file, or `T::default()` when no file was resolved
pub fn load_toml<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            parse_toml(&content)
        }
        None => Ok(T::default()),
    }
}

/// Read a non-empty environment variable
pub fn env_override(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Ok(_) => {
            warn!("Ignoring empty environment variable {}", name);
            None
        }
        Err(_) => None,
    }
}
