//! Runtime configuration
//!
//! One TOML file describes the default Looper, the pool and the log level.
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! log_level = "debug"
//!
//! [looper]
//! name = "main"
//! shutdown_policy = "drain"
//!
//! [pool]
//! size = 4
//! name = "worker"
//! ```
//!
//! # Usage
//!
//! ```rust
//! use looper_runtime::util::config::from_toml_str;
//!
//! let config = from_toml_str("[pool]\nsize = 2").unwrap();
//! assert_eq!(config.pool.size, 2);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::runtime::looper::LooperConfig;
use crate::util::logger::LogLevel;

/// Top-level runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Level used by `logger::init_with_level`
    pub log_level: LogLevel,
    /// The runtime's default Looper
    pub looper: LooperConfig,
    /// The runtime's Looper pool
    pub pool: PoolConfig,
}

/// Pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of Loopers; 0 means one per available CPU
    pub size: usize,
    /// Name prefix for pool members
    pub name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 0,
            name: "pool".to_string(),
        }
    }
}

impl PoolConfig {
    /// Member config derived from the default Looper's settings.
    pub fn looper_config(
        &self,
        base: &LooperConfig,
    ) -> LooperConfig {
        LooperConfig {
            name: self.name.clone(),
            ..base.clone()
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Config serialize error: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Parse a configuration from TOML text
pub fn from_toml_str(content: &str) -> Result<RuntimeConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Render a configuration as TOML text
pub fn to_toml_string(config: &RuntimeConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

/// Load a configuration file
/// Returns default config if file doesn't exist
pub fn load_config(path: impl AsRef<Path>) -> Result<RuntimeConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(RuntimeConfig::default());
    }

    let content = fs::read_to_string(path)?;
    from_toml_str(&content)
}

/// Save a configuration file, creating parent directories as needed
pub fn save_config(
    config: &RuntimeConfig,
    path: impl AsRef<Path>,
) -> Result<(), ConfigError> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    fs::write(path, to_toml_string(config)?)?;
    Ok(())
}
