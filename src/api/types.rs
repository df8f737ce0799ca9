//! Serializable request type mirroring the solve contract

use serde::{Deserialize, Serialize};

use crate::algorithms::residual::TrilaterationModel;
use crate::algorithms::solver::TrilaterationSolver;
use crate::algorithms::weighting::WeightingPolicy;
use crate::core::Solution;
use crate::validation::TrilaterationResult;

/// Everything needed for one solve, as received from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveRequest {
    pub positions: Vec<Vec<f64>>,
    pub distances: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma_positions: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma_distances: Option<Vec<f64>>,
    /// Falls back to the solver configuration's policy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighting: Option<WeightingPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_point: Option<Vec<f64>>,
}

impl SolveRequest {
    /// Request with no sigmas, weighting or initial point
    pub fn new(positions: Vec<Vec<f64>>, distances: Vec<f64>) -> Self {
        Self {
            positions,
            distances,
            sigma_positions: None,
            sigma_distances: None,
            weighting: None,
            initial_point: None,
        }
    }

    /// Parse a request from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate the request and build its residual model
    pub fn model(&self) -> TrilaterationResult<TrilaterationModel> {
        Ok(TrilaterationModel::with_uncertainty(
            &self.positions,
            &self.distances,
            self.sigma_positions.as_deref(),
            self.sigma_distances.as_deref(),
        )?)
    }

    /// Build the model and solve it, using `default_weighting` unless the request names one
    pub fn execute(&self, solver: &TrilaterationSolver, default_weighting: WeightingPolicy) -> TrilaterationResult<Solution> {
        let model = self.model()?;
        let weighting = self.weighting.unwrap_or(default_weighting);
        solver.solve(&model, weighting, self.initial_point.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::TrilaterationError;

    #[test]
    fn test_request_from_json() {
        let json = r#"{
            "positions": [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]],
            "distances": [5.0, 8.06225774829855, 6.708203932499369],
            "weighting": "inverse_square_law"
        }"#;
        let request = SolveRequest::from_json(json).unwrap();
        assert_eq!(request.weighting, Some(WeightingPolicy::InverseSquareLaw));
        assert!(request.sigma_positions.is_none());

        let solution = request
            .execute(&TrilaterationSolver::new(), WeightingPolicy::StdDevWeight)
            .unwrap();
        assert!(solution.converged);
        assert!(solution.distance_to(&[3.0, 4.0]) < 1e-4);
    }

    #[test]
    fn test_request_with_single_anchor_fails() {
        let request = SolveRequest::new(vec![vec![1.0, 1.0]], vec![2.0]);
        let err = request
            .execute(&TrilaterationSolver::new(), WeightingPolicy::StdDevWeight)
            .unwrap_err();
        assert!(matches!(err, TrilaterationError::InvalidModel(_)));
    }

    #[test]
    fn test_optional_fields_omitted_when_serializing() {
        let request = SolveRequest::new(vec![vec![0.0], vec![2.0]], vec![1.0, 1.0]);
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"positions":[[0.0],[2.0]],"distances":[1.0,1.0]}"#);
    }
}
