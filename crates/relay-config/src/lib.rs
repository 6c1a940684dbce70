//! waha-relay Configuration System
//!
//! TOML-based configuration with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub dispatcher: DispatcherConfig,
    pub gateway: GatewayConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on waiting for open connections to finish at shutdown
    pub shutdown_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_secs: 5,
        }
    }
}

impl HttpConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Job dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Number of concurrent delivery workers
    pub workers: usize,
    /// Maximum number of queued, undelivered jobs
    pub queue_capacity: usize,
    /// Drain deadline at shutdown; 0 waits indefinitely
    pub shutdown_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 50,
            queue_capacity: 10_000,
            shutdown_timeout_secs: 30,
        }
    }
}

impl DispatcherConfig {
    pub fn shutdown_timeout(&self) -> Option<Duration> {
        match self.shutdown_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// WAHA gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    /// Delivery identities used in round-robin order
    pub sessions: Vec<String>,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_key: String::new(),
            sessions: vec!["default".to_string()],
            timeout_secs: 15,
            connect_timeout_secs: 5,
        }
    }
}

/// Split a comma-separated session list, dropping blank entries
pub fn parse_session_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Reject configurations the dispatcher cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatcher.workers == 0 {
            return Err(ConfigError::ValidationError(
                "dispatcher.workers must be at least 1".to_string(),
            ));
        }
        if self.dispatcher.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "dispatcher.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.gateway.sessions.is_empty() {
            return Err(ConfigError::ValidationError(
                "gateway.sessions must contain at least one session".to_string(),
            ));
        }
        if self.gateway.sessions.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "gateway.sessions must not contain blank entries".to_string(),
            ));
        }
        if self.gateway.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "gateway.base_url is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# waha-relay Configuration
# Environment variables override these settings

[http]
host = "0.0.0.0"
port = 8080
shutdown_timeout_secs = 5

[dispatcher]
workers = 50
queue_capacity = 10000
shutdown_timeout_secs = 30  # 0 waits for workers indefinitely

[gateway]
base_url = "http://localhost:3000"
api_key = ""
sessions = ["default"]
timeout_secs = 15
connect_timeout_secs = 5
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.dispatcher.workers, 50);
        assert_eq!(config.dispatcher.queue_capacity, 10_000);
        assert_eq!(config.gateway.timeout_secs, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_toml_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert_eq!(config.gateway.sessions, vec!["default".to_string()]);
        assert_eq!(config.dispatcher.shutdown_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dispatcher]\nworkers = 4\n\n[gateway]\nsessions = [\"a\", \"b\"]").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.dispatcher.workers, 4);
        assert_eq!(config.dispatcher.queue_capacity, 10_000);
        assert_eq!(config.gateway.sessions.len(), 2);
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dispatcher\nworkers = ").unwrap();

        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = AppConfig::default();
        config.dispatcher.workers = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = AppConfig::default();
        config.dispatcher.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_sessions() {
        let mut config = AppConfig::default();
        config.gateway.sessions = vec![];
        assert!(config.validate().is_err());

        config.gateway.sessions = vec!["  ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_session_entry() {
        let config: AppConfig =
            toml::from_str("[gateway]\nsessions = [\"A\", \"\", \" \"]").unwrap();
        assert_eq!(config.gateway.sessions.len(), 3);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("blank")));
    }

    #[test]
    fn test_zero_shutdown_timeout_is_unbounded() {
        let mut config = DispatcherConfig::default();
        config.shutdown_timeout_secs = 0;
        assert_eq!(config.shutdown_timeout(), None);
    }

    #[test]
    fn test_parse_session_list() {
        assert_eq!(parse_session_list("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_session_list("solo"), vec!["solo"]);
        assert!(parse_session_list(" , ,").is_empty());
    }
}
