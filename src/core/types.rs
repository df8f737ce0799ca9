//! Core data types for the positioning solver

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the optimizer stopped iterating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Relative step size fell below the parameter tolerance
    StepTolerance,
    /// Relative cost reduction fell below the cost tolerance
    CostTolerance,
    /// Weighted cost is exactly zero
    PerfectFit,
    /// Gradient of the weighted cost is exactly zero
    ///
    /// Counted as converged, but a stationary point need not be a minimum: a
    /// seed on the symmetry axis of collinear anchors (two anchors seeded from
    /// their centroid, for instance) stops on a saddle. Solve again from an
    /// explicit initial point off that axis when the cost stays large.
    ZeroGradient,
    /// Iteration cap reached before any tolerance was met
    MaxIterations,
    /// Residual evaluation cap reached before any tolerance was met
    MaxEvaluations,
}

impl Termination {
    /// Whether this termination counts as convergence
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            Termination::StepTolerance
                | Termination::CostTolerance
                | Termination::PerfectFit
                | Termination::ZeroGradient
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Termination::StepTolerance => "step tolerance reached",
            Termination::CostTolerance => "cost tolerance reached",
            Termination::PerfectFit => "perfect fit",
            Termination::ZeroGradient => "zero gradient",
            Termination::MaxIterations => "iteration limit reached",
            Termination::MaxEvaluations => "evaluation limit reached",
        };
        f.write_str(label)
    }
}

/// Result of a trilateration solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Estimated coordinates, same dimension as the anchors
    pub point: Vec<f64>,
    /// Outer iterations performed
    pub iterations: u32,
    /// Residual evaluations performed, including the one at the seed
    pub evaluations: u32,
    /// Whether a tolerance was met before hitting a cap
    pub converged: bool,
    pub termination: Termination,
    /// Weighted cost `Σ w_i r_i²` at `point`
    pub cost: f64,
    /// Weighted cost at the initial point
    pub initial_cost: f64,
    /// Euclidean norm of the unweighted residual vector at `point`
    pub residual_norm: f64,
    /// `sqrt(cost / anchors)`
    pub rms: f64,
    /// Per-coordinate standard error from `(JᵀWJ)⁻¹`, when that matrix is invertible
    pub parameter_sigma: Option<Vec<f64>>,
}

impl Solution {
    /// Dimension of the estimated point
    pub fn dimension(&self) -> usize {
        self.point.len()
    }

    /// Euclidean distance from the estimate to `other`
    pub fn distance_to(&self, other: &[f64]) -> f64 {
        self.point
            .iter()
            .zip(other)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_convergence_flag() {
        assert!(Termination::StepTolerance.is_converged());
        assert!(Termination::CostTolerance.is_converged());
        assert!(Termination::PerfectFit.is_converged());
        assert!(Termination::ZeroGradient.is_converged());
        assert!(!Termination::MaxIterations.is_converged());
        assert!(!Termination::MaxEvaluations.is_converged());
    }

    #[test]
    fn test_termination_serializes_snake_case() {
        let json = serde_json::to_string(&Termination::MaxIterations).unwrap();
        assert_eq!(json, "\"max_iterations\"");
    }
}
