//! Service configuration.
//!
//! Loaded from a YAML file, after `.env` (via `dotenvy`); a few
//! environment variables override file values so deployments and test
//! rigs can retarget the service without editing it:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `KAFKA_URL` | `kafka.brokers` |
//! | `DATABASE_HOST` | host of the `sql` backend url |
//! | `DATABASE_PORT` | port of the `sql` backend url |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "cannot read config file: {err}"),
            ConfigError::Parse(err) => write!(f, "cannot parse config file: {err}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub kafka: KafkaConfig,
    pub graph: GraphConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    /// Path-type → outbound topic. A type missing here cannot be
    /// forwarded to.
    #[serde(default)]
    pub topic_names: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    #[serde(default = "default_brokers")]
    pub brokers: String,
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    pub topics: Vec<String>,
}

/// Which graph backend to run against.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum GraphConfig {
    /// Embedded single-file store.
    File { path: PathBuf },
    /// Remote SQL server.
    Sql { url: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        AdminConfig {
            listen: default_listen(),
        }
    }
}

fn default_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_consumer_group() -> String {
    "flowline".to_string()
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

impl Config {
    /// Read and parse the file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let _ = dotenvy::dotenv();
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let mut config = Config::from_yaml(&raw)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Config, ConfigError> {
        serde_yaml::from_str(raw).map_err(ConfigError::Parse)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(brokers) = std::env::var("KAFKA_URL") {
            self.kafka.brokers = brokers;
        }
        if let GraphConfig::Sql { url } = &mut self.graph {
            let host = std::env::var("DATABASE_HOST").ok();
            let port = std::env::var("DATABASE_PORT").ok();
            if host.is_some() || port.is_some() {
                let mut parsed = url::Url::parse(url)
                    .map_err(|err| ConfigError::Invalid(format!("graph.url: {err}")))?;
                if let Some(host) = host {
                    parsed
                        .set_host(Some(&host))
                        .map_err(|err| ConfigError::Invalid(format!("DATABASE_HOST: {err}")))?;
                }
                if let Some(port) = port {
                    let port = port.parse::<u16>().map_err(|_| {
                        ConfigError::Invalid(format!("DATABASE_PORT '{port}' is not a port"))
                    })?;
                    parsed
                        .set_port(Some(port))
                        .map_err(|_| ConfigError::Invalid("DATABASE_PORT rejected".to_string()))?;
                }
                *url = parsed.into();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SAMPLE: &str = r#"
kafka:
  consumer_group: flowline
  topics: ["flowline-inbound"]
graph:
  backend: file
  path: ./flowline.db
topic_names:
  REST: REST-topic
  MQTT: MQTT-topic
"#;

    const SAMPLE_SQL: &str = r#"
kafka:
  topics: ["flowline-inbound"]
graph:
  backend: sql
  url: postgres://postgres@localhost:5432/flowline
"#;

    fn clear_env() {
        std::env::remove_var("KAFKA_URL");
        std::env::remove_var("DATABASE_HOST");
        std::env::remove_var("DATABASE_PORT");
    }

    #[test]
    #[serial]
    fn parses_the_file_backend() {
        clear_env();
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.kafka.brokers, "localhost:9092");
        assert_eq!(config.kafka.topics, vec!["flowline-inbound"]);
        assert!(matches!(config.graph, GraphConfig::File { .. }));
        assert_eq!(config.topic_names["REST"], "REST-topic");
        assert_eq!(config.admin.listen, "0.0.0.0:8080");
    }

    #[test]
    #[serial]
    fn kafka_url_overrides_brokers() {
        clear_env();
        std::env::set_var("KAFKA_URL", "kafka.internal:9093");
        let mut config = Config::from_yaml(SAMPLE).unwrap();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.kafka.brokers, "kafka.internal:9093");
        clear_env();
    }

    #[test]
    #[serial]
    fn database_host_and_port_rewrite_the_sql_url() {
        clear_env();
        std::env::set_var("DATABASE_HOST", "db.internal");
        std::env::set_var("DATABASE_PORT", "26257");
        let mut config = Config::from_yaml(SAMPLE_SQL).unwrap();
        config.apply_env_overrides().unwrap();
        match &config.graph {
            GraphConfig::Sql { url } => {
                assert_eq!(url, "postgres://postgres@db.internal:26257/flowline");
            }
            other => panic!("expected sql backend, got {other:?}"),
        }
        clear_env();
    }

    #[test]
    #[serial]
    fn bad_database_port_is_rejected() {
        clear_env();
        std::env::set_var("DATABASE_PORT", "not-a-port");
        let mut config = Config::from_yaml(SAMPLE_SQL).unwrap();
        let err = config.apply_env_overrides().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        clear_env();
    }

    #[test]
    #[serial]
    fn unknown_backend_fails_to_parse() {
        clear_env();
        let raw = SAMPLE.replace("backend: file", "backend: redis");
        assert!(matches!(
            Config::from_yaml(&raw),
            Err(ConfigError::Parse(_))
        ));
    }
}
