//! Configuration management for the densim plugin.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with DENSIM_ prefix)
//! 3. .env files
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use std::path::Path;

use densim_core::{ConfigError, SessionConfig};
use densim_engine::SparseEngineConfig;
use serde::{Deserialize, Serialize};

use crate::tracing_config::{TracingConfig, TracingFormat};

/// Complete plugin configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Pool size, seed and numerical thresholds
    #[serde(default)]
    pub session: SessionConfig,

    /// Reference engine settings
    #[serde(default)]
    pub engine: SparseEngineConfig,

    /// Log output
    #[serde(default)]
    pub logging: TracingConfig,
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

impl PluginConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: PluginConfig = serde_yaml_ng::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with the following precedence:
    /// 1. Load .env file if it exists
    /// 2. Load from file if provided
    /// 3. Apply environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => PluginConfig::default(),
        };

        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Merge environment variables into this configuration.
    ///
    /// Only variables that are set override the current values.
    pub fn merge_env(self) -> Self {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Merge overrides from an arbitrary variable source.
    pub fn merge_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        self.session = self.session.merge_vars(&lookup);

        if let Some(v) = lookup("DENSIM_MAX_DENSE") {
            if let Ok(val) = v.trim().parse() {
                self.engine.max_dense_qubits = val;
            }
        }
        if let Some(v) = lookup("DENSIM_LOG_LEVEL") {
            self.logging.log_level = v;
        }
        if let Some(v) = lookup("DENSIM_LOG_FORMAT") {
            if let Some(format) = TracingFormat::parse(&v) {
                self.logging.format = format;
            }
        }
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;

        if self.engine.max_dense_qubits == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_dense_qubits must be at least 1".to_string(),
            ));
        }
        // Two-operand gates need both operands in the dense state.
        if self.engine.max_dense_qubits < 2 && self.session.capacity >= 2 {
            return Err(ConfigError::ValidationError(
                "engine.max_dense_qubits must be at least 2 for two-qubit gates".to_string(),
            ));
        }

        let level = self.logging.log_level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}",
                self.logging.log_level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = PluginConfig::default();
        assert_eq!(config.session.capacity, 1000);
        assert_eq!(config.engine.max_dense_qubits, 10);
        assert_eq!(config.logging.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial() {
        let config = PluginConfig::from_yaml(
            "session:\n  capacity: 16\n  seed: 7\nlogging:\n  format: json\n",
        )
        .unwrap();
        assert_eq!(config.session.capacity, 16);
        assert_eq!(config.session.seed, Some(7));
        assert_eq!(config.session.projection_epsilon, 1e-20);
        assert_eq!(config.engine.max_dense_qubits, 10);
        assert_eq!(config.logging.format, TracingFormat::Json);
    }

    #[test]
    fn test_yaml_errors() {
        assert!(matches!(
            PluginConfig::from_yaml("session: [1, 2"),
            Err(ConfigError::ParseError(_))
        ));
        assert!(matches!(
            PluginConfig::from_yaml("session:\n  capacity: 0\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            PluginConfig::from_yaml("logging:\n  log_level: loud\n"),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("DENSIM_CAPACITY", "32"),
            ("DENSIM_MAX_DENSE", "6"),
            ("DENSIM_LOG_LEVEL", "debug"),
            ("DENSIM_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let config = PluginConfig::from_yaml("session:\n  capacity: 16\n  seed: 3\n")
            .unwrap()
            .merge_vars(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.session.capacity, 32);
        assert_eq!(config.session.seed, Some(3));
        assert_eq!(config.engine.max_dense_qubits, 6);
        assert_eq!(config.logging.log_level, "debug");
        assert_eq!(config.logging.format, TracingFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            PluginConfig::from_file("/nonexistent/densim.yaml"),
            Err(ConfigError::IoError(_))
        ));
    }
}
