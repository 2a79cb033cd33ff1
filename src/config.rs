use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default = "default_diagnostics_buffer_size")]
    pub diagnostics_buffer_size: usize,

    /// Upper bound on a single transport send.
    #[serde(default = "default_transport_timeout", with = "duration_ms")]
    pub transport_timeout: Duration,

    #[serde(default = "default_shutdown_timeout", with = "duration_ms")]
    pub shutdown_timeout: Duration,

    /// Connectors declared at startup, keyed by the name programs refer to
    /// them by.
    #[serde(default)]
    pub connectors: IndexMap<String, ConnectorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectorConfig {
    pub family: String,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

impl ConnectorConfig {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            properties: IndexMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

fn default_diagnostics_buffer_size() -> usize {
    256
}
fn default_transport_timeout() -> Duration {
    Duration::from_secs(30)
}
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(5)
}

// Duration型のシリアライズ/デシリアライズヘルパー
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            diagnostics_buffer_size: default_diagnostics_buffer_size(),
            transport_timeout: default_transport_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
            connectors: IndexMap::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_connector(mut self, name: impl Into<String>, connector: ConnectorConfig) -> Self {
        self.connectors.insert(name.into(), connector);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.diagnostics_buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "diagnostics_buffer_size must be positive".to_string(),
            ));
        }
        for (name, connector) in &self.connectors {
            if name.is_empty() {
                return Err(ConfigError::Invalid("connector name is empty".to_string()));
            }
            if connector.family.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "connector '{}' has no family",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = RuntimeConfig::from_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.transport_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_connectors_and_durations() {
        let config = RuntimeConfig::from_str(
            r#"{
                "transport_timeout": 250,
                "connectors": {
                    "orders": {
                        "family": "jms",
                        "properties": {"priority": "4", "JMSDeliveryMode": "PERSISTENT"}
                    },
                    "audit": {"family": "jms"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.transport_timeout, Duration::from_millis(250));
        let names: Vec<_> = config.connectors.keys().cloned().collect();
        assert_eq!(names, vec!["orders", "audit"]);
        assert_eq!(
            config.connectors["orders"].properties.get("priority"),
            Some(&"4".to_string())
        );
        assert!(config.connectors["audit"].properties.is_empty());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            RuntimeConfig::from_str(r#"{"connectors": {"x": {"family": ""}}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_str(r#"{"diagnostics_buffer_size": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("conduit-config-{}.json", uuid::Uuid::new_v4()));
        let mut file = File::create(&path).unwrap();
        write!(file, r#"{{"shutdown_timeout": 10}}"#).unwrap();

        let config = RuntimeConfig::from_file(&path).unwrap();
        assert_eq!(config.shutdown_timeout, Duration::from_millis(10));
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            RuntimeConfig::from_file("/nonexistent/conduit.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
