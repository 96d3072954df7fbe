//! Configuration management.
//!
//! Each service loads the same configuration shape under its own environment
//! prefix (e.g. `AUTHORS__DATABASE__URL`, `BOOKS__KAFKA__BOOTSTRAP_SERVERS`).

use serde::Deserialize;

use crate::error::ServiceError;

/// Main service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service identity
    pub service: ServiceConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Kafka configuration
    #[serde(default)]
    pub kafka: KafkaConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name, used for the Kafka client id and consumer group
    pub name: String,

    /// HTTP port for the health endpoint
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    /// Broker bootstrap servers
    #[serde(default = "default_bootstrap_servers")]
    pub bootstrap_servers: String,

    /// Producer delivery timeout in milliseconds
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: default_bootstrap_servers(),
            message_timeout_ms: default_message_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

// Default value functions
fn default_port() -> u16 { 8000 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 5 }
fn default_bootstrap_servers() -> String { "kafka:9092".to_string() }
fn default_message_timeout_ms() -> u64 { 5000 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }

impl Config {
    /// Load configuration from environment variables under the given prefix.
    pub fn load(prefix: &str) -> Result<Self, ServiceError> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(prefix).separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Consumer group name for this service instance.
    pub fn consumer_group(&self) -> String {
        format!("{}-group", self.service.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kafka_defaults() {
        let kafka = KafkaConfig::default();
        assert_eq!(kafka.bootstrap_servers, "kafka:9092");
        assert_eq!(kafka.message_timeout_ms, 5000);
    }

    #[test]
    fn test_consumer_group_naming() {
        let config = Config {
            service: ServiceConfig {
                name: "authors-service".to_string(),
                port: 8001,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/authors".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
            },
            kafka: KafkaConfig::default(),
            observability: ObservabilityConfig::default(),
        };

        assert_eq!(config.consumer_group(), "authors-service-group");
    }
}
