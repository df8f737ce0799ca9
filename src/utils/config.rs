use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::algorithms::weighting::WeightingPolicy;
use crate::core::{MAX_EVALUATIONS, MAX_ITERATIONS};

/// Solver configuration, loadable from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum outer iterations (1..=1000)
    pub max_iterations: u32,
    /// Maximum residual evaluations (1..=1000)
    pub max_evaluations: u32,
    /// Relative cost reduction below which the solve is considered converged
    pub cost_relative_tolerance: f64,
    /// Relative step size below which the solve is considered converged
    pub parameter_relative_tolerance: f64,
    /// Starting value of the damping term λ
    pub initial_damping: f64,
    /// Factor applied to λ after a rejected step (> 1)
    pub damping_increase: f64,
    /// Factor applied to λ after an accepted step (0..1)
    pub damping_decrease: f64,
    /// Consecutive damping increases tolerated before giving up
    pub max_damping_retries: u32,
    /// Weighting used when the caller does not pick one
    pub weighting: WeightingPolicy,
    /// Enable debug logging in the command line tool
    pub debug_logging: bool,
}

/// Configuration validation and I/O errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value} for {parameter}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("failed to access config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize config: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown weighting policy '{0}'")]
    UnknownWeighting(String),
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            max_evaluations: MAX_EVALUATIONS,
            cost_relative_tolerance: 1e-10,
            parameter_relative_tolerance: 1e-10,
            initial_damping: 1e-3,
            damping_increase: 10.0,
            damping_decrease: 0.1,
            max_damping_retries: 50,
            weighting: WeightingPolicy::default(),
            debug_logging: false,
        }
    }
}

impl SolverConfig {
    /// Load and validate a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Parse and validate a configuration from JSON text; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SolverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the configuration to `path` as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_json_pretty()?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every parameter against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 || self.max_iterations > MAX_ITERATIONS {
            return Err(ConfigError::InvalidParameter {
                parameter: "max_iterations",
                value: self.max_iterations.to_string(),
                reason: "must be between 1 and 1000",
            });
        }
        if self.max_evaluations == 0 || self.max_evaluations > MAX_EVALUATIONS {
            return Err(ConfigError::InvalidParameter {
                parameter: "max_evaluations",
                value: self.max_evaluations.to_string(),
                reason: "must be between 1 and 1000",
            });
        }
        positive("cost_relative_tolerance", self.cost_relative_tolerance)?;
        positive("parameter_relative_tolerance", self.parameter_relative_tolerance)?;
        positive("initial_damping", self.initial_damping)?;
        if !(self.damping_increase.is_finite() && self.damping_increase > 1.0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "damping_increase",
                value: self.damping_increase.to_string(),
                reason: "must be a finite number greater than 1",
            });
        }
        if !(self.damping_decrease > 0.0 && self.damping_decrease < 1.0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "damping_decrease",
                value: self.damping_decrease.to_string(),
                reason: "must lie strictly between 0 and 1",
            });
        }
        if self.max_damping_retries == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "max_damping_retries",
                value: self.max_damping_retries.to_string(),
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

fn positive(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            parameter,
            value: value.to_string(),
            reason: "must be a finite positive number",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_iterations, 1000);
        assert_eq!(config.weighting, WeightingPolicy::StdDevWeight);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SolverConfig::from_json_str(r#"{ "max_iterations": 25, "weighting": "combined" }"#).unwrap();
        assert_eq!(config.max_iterations, 25);
        assert_eq!(config.weighting, WeightingPolicy::Combined);
        assert_eq!(config.max_evaluations, 1000);
        assert_eq!(config.damping_increase, 10.0);
    }

    #[test]
    fn test_iteration_cap_enforced() {
        let result = SolverConfig::from_json_str(r#"{ "max_iterations": 5000 }"#);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { parameter: "max_iterations", .. })
        ));

        let config = SolverConfig {
            max_evaluations: 0,
            ..SolverConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_damping_factors_validated() {
        let config = SolverConfig {
            damping_increase: 0.5,
            ..SolverConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { parameter: "damping_increase", .. })
        ));

        let config = SolverConfig {
            damping_decrease: 1.0,
            ..SolverConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SolverConfig {
            initial_damping: f64::NAN,
            ..SolverConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let result = SolverConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(ConfigError::Serialization(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.json");
        let config = SolverConfig {
            max_iterations: 200,
            weighting: WeightingPolicy::InverseSquareLaw,
            debug_logging: true,
            ..SolverConfig::default()
        };
        config.save_to_file(&path).unwrap();
        let loaded = SolverConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let result = SolverConfig::from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
