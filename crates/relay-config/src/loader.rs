//! Configuration loader with file and environment variable support

use crate::{parse_session_list, AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "relay.toml",
    "./config/config.toml",
    "/etc/waha-relay/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load) but reads overrides through `lookup`
    pub fn load_with<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file(&lookup) {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, &lookup);

        Ok(config)
    }

    fn find_config_file<F>(&self, lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured file does not exist, searching defaults");
        }

        if let Some(path) = lookup("RELAY_CONFIG").map(PathBuf::from) {
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parsed<T: std::str::FromStr, F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

fn apply_overrides<F>(config: &mut AppConfig, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(port) = parsed(lookup, "PORT") {
        config.http.port = port;
    }
    if let Some(port) = parsed(lookup, "RELAY_HTTP_PORT") {
        config.http.port = port;
    }
    if let Some(host) = lookup("RELAY_HTTP_HOST") {
        config.http.host = host;
    }

    // Dispatcher
    if let Some(workers) = parsed(lookup, "RELAY_WORKERS") {
        config.dispatcher.workers = workers;
    }
    if let Some(capacity) = parsed(lookup, "RELAY_QUEUE_CAPACITY") {
        config.dispatcher.queue_capacity = capacity;
    }
    if let Some(secs) = parsed(lookup, "RELAY_SHUTDOWN_TIMEOUT_SECS") {
        config.dispatcher.shutdown_timeout_secs = secs;
    }

    // Gateway
    if let Some(url) = lookup("WAHA_URL") {
        config.gateway.base_url = url;
    }
    if let Some(key) = lookup("WAHA_API_KEY") {
        config.gateway.api_key = key;
    }
    if let Some(sessions) = lookup("WAHA_SESSIONS") {
        config.gateway.sessions = parse_session_list(&sessions);
    }
    if let Some(secs) = parsed(lookup, "RELAY_GATEWAY_TIMEOUT_SECS") {
        config.gateway.timeout_secs = secs;
    }
}
