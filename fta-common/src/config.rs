//! Configuration loading for the FTA client
//!
//! Bootstrap configuration comes from a single TOML file. Every field has a
//! built-in default, so a missing file never prevents startup.
//!
//! # Resolution Priority
//!
//! 1. Explicit path (command-line `--config`)
//! 2. Environment variable (`FTA_CONFIG`)
//! 3. Platform config directory (`~/.config/fta/config.toml` on Linux)
//! 4. Built-in defaults

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "FTA_CONFIG";

/// Default service host
pub const DEFAULT_BASE_URL: &str = "https://api.fashtechai.com";

/// Top-level client configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote service location and pipeline addressing
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Scheme and host of the service, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Pipeline function index sent with every queue join
    #[serde(default)]
    pub fn_index: u32,

    /// Trigger id sent with every queue join
    #[serde(default = "default_trigger_id")]
    pub trigger_id: u32,

    /// Timeout for the upload and join requests (not the event stream)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Event stream behaviour
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StreamConfig {
    /// Fail the submission when no event (heartbeats included) arrives for this long
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_trigger_id() -> u32 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_idle_timeout_secs() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            fn_index: 0,
            trigger_id: default_trigger_id(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl StreamConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl ClientConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Reject values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        let base = self.service.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::Config(format!(
                "service.base_url must start with http:// or https://, got '{}'",
                self.service.base_url
            )));
        }
        if base.trim_end_matches('/').split("://").nth(1).map_or(true, str::is_empty) {
            return Err(Error::Config("service.base_url has no host".to_string()));
        }
        if self.stream.idle_timeout_secs == 0 {
            return Err(Error::Config("stream.idle_timeout_secs must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Resolves which config file to use, following the priority order above
pub struct ConfigResolver {
    explicit_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(explicit_path: Option<PathBuf>) -> Self {
        Self { explicit_path }
    }

    /// Find the config file path, if any source names one
    ///
    /// An explicit or environment-provided path is returned even when the
    /// file does not exist, so `resolve` can report it.
    pub fn config_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.explicit_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        default_config_path().filter(|p| p.exists())
    }

    /// Load the resolved configuration
    ///
    /// Missing files fall back to defaults with a warning. A file that exists
    /// but does not parse is an error.
    pub fn resolve(&self) -> Result<ClientConfig> {
        match self.config_path() {
            Some(path) if path.exists() => {
                let config = ClientConfig::load(&path)?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(ClientConfig::default())
            }
            None => {
                info!("No config file found, using built-in defaults");
                Ok(ClientConfig::default())
            }
        }
    }
}

/// Platform config file location (`<config dir>/fta/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fta").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.service.base_url, "https://api.fashtechai.com");
        assert_eq!(config.service.fn_index, 0);
        assert_eq!(config.service.trigger_id, 10);
        assert_eq!(config.stream.idle_timeout(), Duration::from_secs(120));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = ClientConfig::from_toml_str(
            r#"
            [service]
            base_url = "http://localhost:7860"

            [stream]
            idle_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.service.base_url, "http://localhost:7860");
        assert_eq!(config.service.trigger_id, 10);
        assert_eq!(config.stream.idle_timeout_secs, 5);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(ClientConfig::from_toml_str("[service]\nbase_url = \"ftp://x\"").is_err());
        assert!(ClientConfig::from_toml_str("[service]\nbase_url = \"https://\"").is_err());
        assert!(ClientConfig::from_toml_str("[stream]\nidle_timeout_secs = 0").is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ClientConfig::from_toml_str("[service\nbase_url=").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
