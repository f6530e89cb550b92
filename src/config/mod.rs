//! Plugin configuration.
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. `config.toml` in the user config dir, or the file passed explicitly
//! 3. `AGENTBAY_API_KEY` / `AGENTBAY_ENDPOINT` from the environment

use crate::sandbox::agentbay::AGENTBAY_API_BASE;
use crate::security::{validate_image_id, validate_timeout, ALLOWED_IMAGE_IDS};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILENAME: &str = "config.toml";
pub const ENV_API_KEY: &str = "AGENTBAY_API_KEY";
pub const ENV_ENDPOINT: &str = "AGENTBAY_ENDPOINT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// API key for the session service. Usually supplied via `AGENTBAY_API_KEY`.
    pub api_key: Option<String>,

    /// Base URL of the session service API.
    pub endpoint: String,

    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,

    /// Image used by `session_create` when none is given.
    pub default_image_id: String,

    /// Timeout used by `command_execute` when none is given.
    pub command_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: AGENTBAY_API_BASE.to_string(),
            request_timeout_secs: 120,
            default_image_id: "linux_latest".to_string(),
            command_timeout_ms: 30_000,
        }
    }
}

/// `~/.config/agentbay-plugin` or the platform equivalent.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "agentbay-plugin").map(|d| d.config_dir().to_path_buf())
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

impl Config {
    /// Load from `explicit` (tilde-expanded) or the default location, then
    /// apply environment overrides.
    pub fn load(explicit: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_with(explicit, |name| std::env::var(name).ok())
    }

    fn load_with(
        explicit: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => {
                let path = PathBuf::from(shellexpand::tilde(path).as_ref());
                Self::from_file(&path)?
            }
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    tracing::debug!("no config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_overrides(env);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!(path = %path.display(), "loading config");
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(key) = env(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(endpoint) = env(ENV_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            self.endpoint = endpoint;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        if !validate_image_id(&self.default_image_id) {
            return Err(ConfigError::Invalid(format!(
                "default_image_id {} is not one of {}",
                self.default_image_id,
                ALLOWED_IMAGE_IDS.join(", ")
            )));
        }
        let timeout_in_range = i64::try_from(self.command_timeout_ms)
            .map(validate_timeout)
            .unwrap_or(false);
        if !timeout_in_range {
            return Err(ConfigError::Invalid(format!(
                "command_timeout_ms {} is out of range",
                self.command_timeout_ms
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// JSON schema of the config file.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Config)).unwrap_or_default()
    }
}
