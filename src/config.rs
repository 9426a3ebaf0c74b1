//! Configuration loading and management
//!
//! Handles parsing of `.steward.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Configuration file name looked up in a directory
pub const CONFIG_FILENAME: &str = ".steward.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API endpoint configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Creation wizard configuration
    #[serde(default)]
    pub wizard: WizardConfig,

    /// Event emission configuration
    #[serde(default)]
    pub events: EventsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            wizard: WizardConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

/// API endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API host
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Creation wizard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Simulated draft-generation latency in milliseconds
    #[serde(default = "default_generation_delay_ms")]
    pub generation_delay_ms: u64,
}

fn default_generation_delay_ms() -> u64 {
    1500
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            generation_delay_ms: default_generation_delay_ms(),
        }
    }
}

/// Event emission configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventsConfig {
    /// Event destination: "-" for stdout, otherwise a file path.
    /// Absent means events are disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl Config {
    /// Load configuration from a `.steward.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILENAME);
        if config_path.exists() {
            Self::load(&config_path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.api.validate()?;
        if self.wizard.generation_delay_ms > 60_000 {
            return Err(Error::InvalidConfig(
                "wizard.generation_delay_ms must be <= 60000".to_string(),
            ));
        }
        Ok(())
    }
}

impl ApiConfig {
    fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(Error::InvalidConfig(
                "api.base_url cannot be empty".to_string(),
            ));
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(Error::InvalidConfig(format!(
                "api.base_url must start with http:// or https://, got '{base}'"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "api.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
