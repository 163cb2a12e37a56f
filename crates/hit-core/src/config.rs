//! Engine configuration.
//!
//! Defaults match the deployed form: x in [-3, 5], y from the integer
//! selector -5..=5, r from {1, 1.5, 2, 2.5, 3}, and a 100-record history
//! window in responses.
//!
//! ```toml
//! x_min = -3.0
//! x_max = 5.0
//! allowed_y = [-2.0, -1.0, 0.0, 1.0, 2.0]
//! allowed_r = [1.0, 2.0, 3.0]
//! history_window = 0   # 0 returns the full ledger
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HitError, Result};

/// Default number of records returned in each response.
pub const DEFAULT_HISTORY_WINDOW: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Inclusive lower bound for x.
    pub x_min: f64,
    /// Inclusive upper bound for x.
    pub x_max: f64,
    /// Values y may take.
    pub allowed_y: Vec<f64>,
    /// Values r may take.
    pub allowed_r: Vec<f64>,
    /// Newest records included in each response; 0 means the whole ledger.
    pub history_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            x_min: -3.0,
            x_max: 5.0,
            allowed_y: (-5..=5).map(f64::from).collect(),
            allowed_r: vec![1.0, 1.5, 2.0, 2.5, 3.0],
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document. Absent keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if !self.x_min.is_finite() || !self.x_max.is_finite() {
            return Err(HitError::Config("x bounds must be finite".to_string()));
        }
        if self.x_min > self.x_max {
            return Err(HitError::Config(format!(
                "x_min ({}) must not exceed x_max ({})",
                self.x_min, self.x_max
            )));
        }
        if self.allowed_y.is_empty() {
            return Err(HitError::Config("allowed_y cannot be empty".to_string()));
        }
        if self.allowed_y.iter().any(|y| !y.is_finite()) {
            return Err(HitError::Config("allowed_y values must be finite".to_string()));
        }
        if self.allowed_r.is_empty() {
            return Err(HitError::Config("allowed_r cannot be empty".to_string()));
        }
        if self.allowed_r.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(HitError::Config(
                "allowed_r values must be finite and positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.allowed_y.len(), 11);
        assert_eq!(config.allowed_r, vec![1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("history_window = 0\n").unwrap();
        assert_eq!(config.history_window, 0);
        assert_eq!(config.x_min, -3.0);
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = EngineConfig::from_toml_str("x_minimum = 1.0\n").unwrap_err();
        assert!(matches!(err, HitError::ConfigParse(_)));
    }

    #[test]
    fn inverted_bounds_rejected() {
        let err = EngineConfig::from_toml_str("x_min = 5.0\nx_max = -3.0\n").unwrap_err();
        assert!(err.to_string().contains("x_min"));
    }

    #[test]
    fn non_positive_radius_rejected() {
        let err = EngineConfig::from_toml_str("allowed_r = [0.0, 1.0]\n").unwrap_err();
        assert!(matches!(err, HitError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hitcheck.toml");
        std::fs::write(&path, "allowed_r = [1.0, 2.0]\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.allowed_r, vec![1.0, 2.0]);
    }
}
