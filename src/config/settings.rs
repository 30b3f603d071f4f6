//! Configuration settings for the validation client.

use serde::Deserialize;
use std::path::Path;

use crate::auth::decode_api_key;
use crate::consensus::ConsensusPolicy;
use crate::error::ValidateError;
use crate::transport::DEFAULT_USER_AGENT;
use crate::validator::HostSelection;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub client: ClientConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Validation service credentials and host policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base64-encoded shared secret.
    pub api_key: String,
    /// Client ID issued with the API key.
    #[serde(default)]
    pub client_id: Option<u64>,
    /// Validation hosts; empty means the default YubiCloud hosts.
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Use HTTPS.
    #[serde(default = "default_secure")]
    pub secure: bool,
    /// Query every host instead of one.
    #[serde(default)]
    pub multi: bool,
    /// How multiple replies become one verdict.
    #[serde(default)]
    pub policy: ConsensusPolicy,
    /// How the host for single-host checks is chosen.
    #[serde(default)]
    pub host_selection: HostSelection,
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Per-request deadline in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// `User-Agent` header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_secure() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ValidateError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ValidateError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ValidateError::Config { message } => ValidateError::Config {
                message: format!("{} (in '{}')", message, path.display()),
            },
            other => other,
        })
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ValidateError> {
        let settings: Settings = toml::from_str(content).map_err(|e| ValidateError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), ValidateError> {
        decode_api_key(&self.client.api_key)?;

        if self.client.hosts.iter().any(|h| h.trim().is_empty()) {
            return Err(ValidateError::config("Host list contains an empty entry"));
        }

        if self.transport.request_timeout_ms == 0 {
            return Err(ValidateError::config("request_timeout_ms must be greater than zero"));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ValidateError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        // Validate log format
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(ValidateError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        Ok(())
    }
}
