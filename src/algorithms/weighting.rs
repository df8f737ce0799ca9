//! Per-anchor weighting policies

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::algorithms::residual::TrilaterationModel;
use crate::utils::config::ConfigError;

/// How much influence each anchor gets in the weighted cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingPolicy {
    /// `1 / sqrt(σd² + σp²)`: anchors with lower combined uncertainty dominate
    #[default]
    StdDevWeight,
    /// `1 / d²`: nearer anchors dominate
    InverseSquareLaw,
    /// Product of the two above
    Combined,
}

impl WeightingPolicy {
    pub const ALL: [WeightingPolicy; 3] = [
        WeightingPolicy::StdDevWeight,
        WeightingPolicy::InverseSquareLaw,
        WeightingPolicy::Combined,
    ];

    /// Map a numeric selector to a policy; unknown codes fall back to `StdDevWeight`
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => WeightingPolicy::InverseSquareLaw,
            2 => WeightingPolicy::Combined,
            _ => WeightingPolicy::StdDevWeight,
        }
    }

    /// Numeric selector accepted by [`from_code`](Self::from_code)
    pub fn code(self) -> i64 {
        match self {
            WeightingPolicy::StdDevWeight => 0,
            WeightingPolicy::InverseSquareLaw => 1,
            WeightingPolicy::Combined => 2,
        }
    }

    /// Weight of a single anchor
    pub fn weight(self, sigma_distance: f64, sigma_position: f64, distance: f64) -> f64 {
        match self {
            WeightingPolicy::StdDevWeight => std_dev_weight(sigma_distance, sigma_position),
            WeightingPolicy::InverseSquareLaw => inverse_square_law(distance),
            WeightingPolicy::Combined => {
                std_dev_weight(sigma_distance, sigma_position) * inverse_square_law(distance)
            }
        }
    }

    /// Diagonal of the weight matrix for `model`, one entry per anchor
    pub fn weights(self, model: &TrilaterationModel) -> DVector<f64> {
        let sigma_distances = model.sigma_distances();
        let sigma_positions = model.sigma_positions();
        let distances = model.distances();
        DVector::from_fn(model.anchor_count(), |i, _| {
            self.weight(sigma_distances[i], sigma_positions[i], distances[i])
        })
    }

    /// Kebab-case name used on the command line and in logs
    pub fn name(self) -> &'static str {
        match self {
            WeightingPolicy::StdDevWeight => "std-dev",
            WeightingPolicy::InverseSquareLaw => "inverse-square",
            WeightingPolicy::Combined => "combined",
        }
    }
}

fn std_dev_weight(sigma_distance: f64, sigma_position: f64) -> f64 {
    1.0 / (sigma_distance * sigma_distance + sigma_position * sigma_position).sqrt()
}

fn inverse_square_law(distance: f64) -> f64 {
    1.0 / (distance * distance)
}

impl fmt::Display for WeightingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WeightingPolicy {
    type Err = ConfigError;

    /// Accepts policy names in kebab or snake case, or a numeric selector code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "std-dev" | "std-dev-weight" | "stddev" => Ok(WeightingPolicy::StdDevWeight),
            "inverse-square" | "inverse-square-law" => Ok(WeightingPolicy::InverseSquareLaw),
            "combined" => Ok(WeightingPolicy::Combined),
            other => other
                .parse::<i64>()
                .map(WeightingPolicy::from_code)
                .map_err(|_| ConfigError::UnknownWeighting(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EPSILON;
    use approx::assert_relative_eq;

    #[test]
    fn test_std_dev_weight() {
        let w = WeightingPolicy::StdDevWeight.weight(3.0, 4.0, 100.0);
        assert_relative_eq!(w, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_square_law() {
        let w = WeightingPolicy::InverseSquareLaw.weight(3.0, 4.0, 4.0);
        assert_relative_eq!(w, 1.0 / 16.0, epsilon = 1e-12);
    }

    #[test]
    fn test_combined_is_product() {
        let w = WeightingPolicy::Combined.weight(3.0, 4.0, 2.0);
        assert_relative_eq!(w, 0.2 * 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_code_fallback() {
        assert_eq!(WeightingPolicy::from_code(0), WeightingPolicy::StdDevWeight);
        assert_eq!(WeightingPolicy::from_code(1), WeightingPolicy::InverseSquareLaw);
        assert_eq!(WeightingPolicy::from_code(2), WeightingPolicy::Combined);
        assert_eq!(WeightingPolicy::from_code(7), WeightingPolicy::StdDevWeight);
        assert_eq!(WeightingPolicy::from_code(-1), WeightingPolicy::StdDevWeight);
        for policy in WeightingPolicy::ALL {
            assert_eq!(WeightingPolicy::from_code(policy.code()), policy);
        }
    }

    #[test]
    fn test_parse_names_and_codes() {
        assert_eq!("std-dev".parse::<WeightingPolicy>().unwrap(), WeightingPolicy::StdDevWeight);
        assert_eq!("inverse_square".parse::<WeightingPolicy>().unwrap(), WeightingPolicy::InverseSquareLaw);
        assert_eq!("Combined".parse::<WeightingPolicy>().unwrap(), WeightingPolicy::Combined);
        assert_eq!("1".parse::<WeightingPolicy>().unwrap(), WeightingPolicy::InverseSquareLaw);
        assert_eq!("42".parse::<WeightingPolicy>().unwrap(), WeightingPolicy::StdDevWeight);
        assert!(matches!(
            "loudest".parse::<WeightingPolicy>(),
            Err(ConfigError::UnknownWeighting(_))
        ));
    }

    #[test]
    fn test_zero_distance_weights_stay_finite() {
        let model = TrilaterationModel::new(&[[0.0, 0.0], [4.0, 0.0]], &[0.0, 4.0]).unwrap();
        for policy in WeightingPolicy::ALL {
            let weights = policy.weights(&model);
            assert!(weights.iter().all(|w| w.is_finite() && *w > 0.0), "{policy}: {weights}");
        }
        let weights = WeightingPolicy::InverseSquareLaw.weights(&model);
        assert_relative_eq!(weights[0], 1.0 / (EPSILON * EPSILON), max_relative = 1e-12);
    }

    #[test]
    fn test_default_sigmas_give_uniform_weights() {
        let model = TrilaterationModel::new(&[[0.0, 0.0], [4.0, 0.0], [0.0, 9.0]], &[1.0, 2.0, 3.0]).unwrap();
        let weights = WeightingPolicy::StdDevWeight.weights(&model);
        assert_relative_eq!(weights[0], weights[1]);
        assert_relative_eq!(weights[1], weights[2]);
    }
}
