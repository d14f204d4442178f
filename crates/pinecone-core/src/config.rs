//! Provider Configuration Management
//!
//! Handles configuration from environment variables and TOML config
//! files, with defaults matching the hosted control plane.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_API_KEY: &str = "PINECONE_API_KEY";
pub const ENV_ENVIRONMENT: &str = "PINECONE_ENVIRONMENT";
pub const ENV_CONTROLLER_URL: &str = "PINECONE_CONTROLLER_URL";
pub const ENV_REQUEST_TIMEOUT: &str = "PINECONE_REQUEST_TIMEOUT_SECS";
pub const ENV_POLL_INTERVAL: &str = "PINECONE_POLL_INTERVAL_SECS";
pub const ENV_POLL_TIMEOUT: &str = "PINECONE_POLL_TIMEOUT_SECS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Control-plane client configuration
    pub client: ClientConfig,

    /// Readiness polling configuration
    pub polling: PollingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Client
        if let Some(key) = lookup(ENV_API_KEY) {
            self.client.api_key = Some(key);
        }
        if let Some(environment) = lookup(ENV_ENVIRONMENT) {
            self.client.environment = Some(environment);
        }
        if let Some(url) = lookup(ENV_CONTROLLER_URL) {
            self.client.controller_url = Some(url);
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT) {
            self.client.request_timeout_secs = parse_secs(ENV_REQUEST_TIMEOUT, secs)?;
        }

        // Polling
        if let Some(secs) = lookup(ENV_POLL_INTERVAL) {
            self.polling.interval_secs = parse_secs(ENV_POLL_INTERVAL, secs)?;
        }
        if let Some(secs) = lookup(ENV_POLL_TIMEOUT) {
            // 0 means "no limit"
            let secs = parse_secs(ENV_POLL_TIMEOUT, secs)?;
            self.polling.timeout_secs = (secs > 0).then_some(secs);
        }

        // Logging
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.logging.json_format = match format.to_lowercase().as_str() {
                "json" => true,
                "text" | "pretty" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_LOG_FORMAT.to_string(),
                        value: format,
                    })
                }
            };
        }

        Ok(())
    }
}

fn parse_secs(key: &str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        })
}

/// Control-plane client configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API key sent as the `Api-Key` header
    pub api_key: Option<String>,

    /// Project environment, e.g. "us-west4-gcp-free"
    pub environment: Option<String>,

    /// Override for the controller base URL
    pub controller_url: Option<String>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            environment: None,
            controller_url: None,
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Base URL of the controller for the configured environment
    pub fn base_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.controller_url {
            return Ok(url.trim_end_matches('/').to_string());
        }

        let environment = self
            .environment
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired("environment".to_string()))?;

        Ok(format!("https://controller.{environment}.pinecone.io"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// The API key must never reach the logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("environment", &self.environment)
            .field("controller_url", &self.controller_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Readiness polling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds between two status queries
    pub interval_secs: u64,

    /// Give up waiting after this many seconds; `None` waits indefinitely
    pub timeout_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            timeout_secs: None,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// `None` or `Some(0)` waits indefinitely
    pub fn max_wait(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.polling.interval(), Duration::from_secs(10));
        assert_eq!(config.polling.max_wait(), None);
        assert_eq!(config.client.request_timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_lookup() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_API_KEY, "secret"),
            (ENV_ENVIRONMENT, "us-west4-gcp-free"),
            (ENV_POLL_INTERVAL, "2"),
            (ENV_POLL_TIMEOUT, "600"),
            (ENV_LOG_FORMAT, "json"),
        ]))
        .unwrap();

        assert_eq!(config.client.api_key.as_deref(), Some("secret"));
        assert_eq!(
            config.client.base_url().unwrap(),
            "https://controller.us-west4-gcp-free.pinecone.io"
        );
        assert_eq!(config.polling.interval_secs, 2);
        assert_eq!(config.polling.max_wait(), Some(Duration::from_secs(600)));
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_zero_poll_timeout_means_unbounded() {
        let config = AppConfig::from_lookup(lookup(&[(ENV_POLL_TIMEOUT, "0")])).unwrap();
        assert_eq!(config.polling.timeout_secs, None);
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let config = AppConfig::from_lookup(lookup(&[(ENV_API_KEY, "  ")])).unwrap();
        assert!(config.client.api_key.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_POLL_INTERVAL, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == ENV_POLL_INTERVAL));

        let err = AppConfig::from_lookup(lookup(&[(ENV_LOG_FORMAT, "xml")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_controller_url_override() {
        let client = ClientConfig {
            controller_url: Some("http://127.0.0.1:9000/".to_string()),
            ..Default::default()
        };
        assert_eq!(client.base_url().unwrap(), "http://127.0.0.1:9000");
        assert!(ClientConfig::default().base_url().is_err());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let client = ClientConfig {
            api_key: Some("pc-very-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("pc-very-secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[client]
environment = "eu-west1-gcp"

[polling]
interval_secs = 1
timeout_secs = 120
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.client.environment.as_deref(), Some("eu-west1-gcp"));
        assert_eq!(config.client.request_timeout_secs, 30);
        assert_eq!(config.polling.interval_secs, 1);
        assert_eq!(config.polling.timeout_secs, Some(120));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_zero_timeout_in_file_waits_indefinitely() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[polling]
interval_secs = 0
timeout_secs = 0
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.polling.interval(), Duration::ZERO);
        assert_eq!(config.polling.max_wait(), None);
    }

    #[test]
    fn test_from_file_missing() {
        let err = AppConfig::from_file("/nonexistent/pinecone.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError { .. }));
    }
}
