//! Temperature predictor: a ridge-regularized linear model over standardized
//! climate features.
//!
//! - `scaler` - per-feature standardization fitted on the training rows
//! - `ridge` - training (split, fit, evaluation) and inference
//! - `metrics` - evaluation metrics

pub mod metrics;
pub mod ridge;
pub mod scaler;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::model::Variable;

pub use metrics::Metrics;
pub use ridge::{fit, FitOutcome, RidgeModel};
pub use scaler::StandardScaler;

/// Errors for model configuration, training and inference.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Feature vector length differs from the trained feature set.
    #[error("invalid input: expected {expected} features, got {got}")]
    InvalidInput { expected: usize, got: usize },

    #[error("invalid input: feature {index} is not a finite number")]
    NonFiniteInput { index: usize },

    #[error("insufficient data: need at least {required} complete rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("computation error: {0}")]
    ComputationError(String),
}

/// Training options. Defaults reproduce the dashboard's fixed setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Share of complete rows held out for evaluation.
    pub test_split_fraction: f64,
    /// L2 penalty strength.
    pub ridge_alpha: f64,
    pub features: Vec<Variable>,
    pub target: Variable,
    /// Seed of the shuffle that assigns rows to the two partitions.
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            test_split_fraction: 0.2,
            ridge_alpha: 1.0,
            features: vec![
                Variable::Co2Emissions,
                Variable::SeaLevelRise,
                Variable::Precipitation,
                Variable::Humidity,
                Variable::WindSpeed,
            ],
            target: Variable::Temperature,
            seed: 42,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.test_split_fraction > 0.0 && self.test_split_fraction < 1.0) {
            return Err(ModelError::InvalidConfig(format!(
                "test_split_fraction must be in (0, 1), got {}",
                self.test_split_fraction
            )));
        }
        if !(self.ridge_alpha >= 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "ridge_alpha must be non-negative, got {}",
                self.ridge_alpha
            )));
        }
        if self.features.is_empty() {
            return Err(ModelError::InvalidConfig("feature list is empty".to_string()));
        }
        if self.features.contains(&self.target) {
            return Err(ModelError::InvalidConfig(format!(
                "target '{}' is also listed as a feature",
                self.target
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.features.len(), 5);
        assert!(!config.features.contains(&Variable::Temperature));
    }

    #[test]
    fn test_invalid_configs() {
        let bad_split = ModelConfig { test_split_fraction: 1.0, ..Default::default() };
        assert!(matches!(bad_split.validate(), Err(ModelError::InvalidConfig(_))));

        let bad_alpha = ModelConfig { ridge_alpha: -0.5, ..Default::default() };
        assert!(matches!(bad_alpha.validate(), Err(ModelError::InvalidConfig(_))));

        let no_features = ModelConfig { features: Vec::new(), ..Default::default() };
        assert!(matches!(no_features.validate(), Err(ModelError::InvalidConfig(_))));

        let target_in_features = ModelConfig { target: Variable::Humidity, ..Default::default() };
        assert!(matches!(target_in_features.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"ridge_alpha": 0.5, "features": ["Humidity", "Wind Speed"]}"#).unwrap();
        assert_eq!(config.ridge_alpha, 0.5);
        assert_eq!(config.features, vec![Variable::Humidity, Variable::WindSpeed]);
        assert_eq!(config.test_split_fraction, 0.2);
        assert_eq!(config.target, Variable::Temperature);
    }
}
