//! CLI configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use mass_core::protocol_constants::{
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_EVENT_CAPACITY,
    DEFAULT_READY_TIMEOUT_MS,
};
use mass_core::ClientConfig;
use serde::Deserialize;

/// CLI configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliConfig {
    /// Server base URL (`http://host:8095`) or websocket URL.
    /// Override: `MASS_SERVER_URL`
    pub server_url: Option<String>,

    /// Override: `MASS_CONNECT_TIMEOUT_MS`
    pub connect_timeout_ms: u64,

    /// How long to wait for the server handshake.
    /// Override: `MASS_READY_TIMEOUT_MS`
    pub ready_timeout_ms: u64,

    /// Default wait for a command result.
    /// Override: `MASS_COMMAND_TIMEOUT_MS`
    pub command_timeout_ms: u64,

    /// Events buffered before a slow consumer starts losing the oldest.
    /// Override: `MASS_EVENT_CAPACITY`
    pub event_capacity: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            ready_timeout_ms: DEFAULT_READY_TIMEOUT_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl CliConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `MASS_*` overrides looked up through `var`.
    ///
    /// Unparseable values are ignored. `MASS_SERVER_URL` is handled by clap
    /// in main.rs.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let millis = |key: &str| -> Option<u64> { var(key).and_then(|v| v.trim().parse().ok()) };

        if let Some(ms) = millis("MASS_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = ms;
        }
        if let Some(ms) = millis("MASS_READY_TIMEOUT_MS") {
            self.ready_timeout_ms = ms;
        }
        if let Some(ms) = millis("MASS_COMMAND_TIMEOUT_MS") {
            self.command_timeout_ms = ms;
        }
        if let Some(capacity) = var("MASS_EVENT_CAPACITY").and_then(|v| v.trim().parse().ok()) {
            self.event_capacity = capacity;
        }
    }

    /// Converts to mass-core's ClientConfig type.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_ready_timeout(Duration::from_millis(self.ready_timeout_ms))
            .with_command_timeout(Duration::from_millis(self.command_timeout_ms))
            .with_event_capacity(self.event_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server_url: http://music.local:8095").unwrap();
        writeln!(file, "command_timeout_ms: 2500").unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server_url.as_deref(), Some("http://music.local:8095"));
        assert_eq!(config.command_timeout_ms, 2500);
        assert_eq!(config.ready_timeout_ms, DEFAULT_READY_TIMEOUT_MS);
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn load_reports_unreadable_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        let err = CliConfig::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "ready_timeout_ms: [not, a, number]\n").unwrap();
        let err = CliConfig::load(Some(&bad)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn overrides_replace_parseable_values_only() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MASS_READY_TIMEOUT_MS", "500"),
            ("MASS_COMMAND_TIMEOUT_MS", "soon"),
            ("MASS_EVENT_CAPACITY", " 32 "),
        ]);
        let mut config = CliConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.ready_timeout_ms, 500);
        assert_eq!(config.command_timeout_ms, DEFAULT_COMMAND_TIMEOUT_MS);
        assert_eq!(config.event_capacity, 32);
    }

    #[test]
    fn converts_to_client_config() {
        let config = CliConfig {
            connect_timeout_ms: 1000,
            ready_timeout_ms: 2000,
            command_timeout_ms: 3000,
            event_capacity: 8,
            ..CliConfig::default()
        };
        let client = config.to_client_config();
        assert_eq!(client.connect_timeout, Duration::from_secs(1));
        assert_eq!(client.ready_timeout, Duration::from_secs(2));
        assert_eq!(client.command_timeout, Duration::from_secs(3));
        assert_eq!(client.event_capacity, 8);
        assert!(client.validate().is_ok());
    }
}
