//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of engine slots, fixed for the lifetime of the session.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Seed for the measurement random stream. Unseeded sessions draw
    /// entropy from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Forced projections onto outcomes less likely than this fail.
    #[serde(default = "default_projection_epsilon")]
    pub projection_epsilon: f64,

    /// The engine is renormalized once the accumulated trace drops below
    /// this.
    #[serde(default = "default_renormalize_threshold")]
    pub renormalize_threshold: f64,
}

fn default_capacity() -> usize {
    1000
}

fn default_projection_epsilon() -> f64 {
    1e-20
}

fn default_renormalize_threshold() -> f64 {
    1e-10
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            capacity: default_capacity(),
            seed: None,
            projection_epsilon: default_projection_epsilon(),
            renormalize_threshold: default_renormalize_threshold(),
        }
    }
}

impl SessionConfig {
    /// Config with a fixed capacity and seed, everything else default.
    pub fn seeded(capacity: usize, seed: u64) -> Self {
        SessionConfig {
            capacity,
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "capacity must be at least 1".to_string(),
            ));
        }

        if !(self.projection_epsilon.is_finite() && self.projection_epsilon >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "projection_epsilon must be a non-negative number, got {}",
                self.projection_epsilon
            )));
        }

        if !(self.renormalize_threshold.is_finite()
            && self.renormalize_threshold > 0.0
            && self.renormalize_threshold <= 1.0)
        {
            return Err(ConfigError::ValidationError(format!(
                "renormalize_threshold must be in (0, 1], got {}",
                self.renormalize_threshold
            )));
        }

        Ok(())
    }

    /// Apply `DENSIM_CAPACITY` and `DENSIM_SEED` from the environment.
    ///
    /// Unset or unparsable variables leave the field unchanged.
    pub fn merge_env(self) -> Self {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn merge_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("DENSIM_CAPACITY") {
            if let Ok(val) = v.trim().parse() {
                self.capacity = val;
            }
        }
        if let Some(v) = lookup("DENSIM_SEED") {
            if let Ok(val) = v.trim().parse() {
                self.seed = Some(val);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.seed, None);
        assert_eq!(config.projection_epsilon, 1e-20);
        assert_eq!(config.renormalize_threshold, 1e-10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let config = SessionConfig {
            capacity: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_threshold() {
        let config = SessionConfig {
            renormalize_threshold: 0.0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            projection_epsilon: f64::NAN,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_vars() {
        let vars: HashMap<&str, &str> = [("DENSIM_CAPACITY", "8"), ("DENSIM_SEED", " 42 ")]
            .into_iter()
            .collect();
        let config = SessionConfig::default().merge_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.capacity, 8);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_merge_vars_ignores_garbage() {
        let config = SessionConfig::seeded(4, 1).merge_vars(|k| match k {
            "DENSIM_CAPACITY" => Some("lots".to_string()),
            _ => None,
        });
        assert_eq!(config.capacity, 4);
        assert_eq!(config.seed, Some(1));
    }

    #[test]
    fn test_missing_fields_default() {
        let config: SessionConfig = serde_json::from_str(r#"{"capacity": 3}"#).unwrap();
        assert_eq!(config.capacity, 3);
        assert_eq!(config.renormalize_threshold, 1e-10);
    }
}
