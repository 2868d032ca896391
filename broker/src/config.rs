use serde::Deserialize;

use crate::constants;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub connections: Connections,
    pub security: Security,
    pub dispatcher: DispatcherConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connections: Connections::default(),
            security: Security::default(),
            dispatcher: DispatcherConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Connections {
    pub bind: String,
    pub max_connections: usize,
    pub min_connection_interval_secs: u64,
    pub max_packet_size: usize,
    pub max_client_id_length: usize,
}

impl Default for Connections {
    fn default() -> Self {
        Self {
            bind: constants::DEFAULT_BIND.to_string(),
            max_connections: constants::MAX_CONNECTIONS,
            min_connection_interval_secs: constants::MIN_CONNECTION_INTERVAL_SECS,
            max_packet_size: constants::MAX_PACKET_SIZE,
            max_client_id_length: constants::MAX_CLIENT_ID_LENGTH,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Security {
    pub allow_anonymous: bool,
}

/// Dispatcher worker pool tunables. No storage section: the shipped
/// repository is in-memory only and has no file to point at.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DispatcherConfig {
    pub worker_count: usize,
    pub ack_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_count: constants::DISPATCHER_WORKERS,
            ack_timeout_secs: constants::ACK_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// # Errors
    ///
    /// Returns an error if `path` cannot be read or does not parse as TOML
    /// matching this shape.
    pub fn load(path: &str) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| crate::error::Error::new(crate::error::ErrorKind::StorageError, &e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.connections.bind, constants::DEFAULT_BIND);
        assert!(!config.security.allow_anonymous);
        assert_eq!(config.dispatcher.worker_count, constants::DISPATCHER_WORKERS);
        assert_eq!(config.dispatcher.ack_timeout_secs, constants::ACK_TIMEOUT_SECS);
    }

    #[test]
    fn dispatcher_section_overridable() {
        let toml_str = "[dispatcher]\nworker_count = 2\nack_timeout_secs = 10\n";
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dispatcher.worker_count, 2);
        assert_eq!(config.dispatcher.ack_timeout_secs, 10);
    }

    #[test]
    fn parses_partial_toml() {
        let toml_str = "[connections]\nbind = \"0.0.0.0:1883\"\n";
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.connections.bind, "0.0.0.0:1883");
        assert_eq!(config.connections.max_connections, constants::MAX_CONNECTIONS);
    }
}
