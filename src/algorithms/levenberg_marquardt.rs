//! Damped Gauss-Newton (Levenberg-Marquardt) engine for weighted least squares
//!
//! Minimizes `Σ_i w_i (r_i(p) - t_i)²` for any problem that can report its
//! residual vector and Jacobian. Each iteration solves
//!
//! ```text
//! (JᵀWJ + λI) Δ = -JᵀW r
//! ```
//!
//! by Cholesky factorization. A step that lowers the cost is accepted and `λ`
//! shrinks; otherwise `λ` grows and the system is solved again with the same
//! Jacobian.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace, warn};

use crate::core::{Termination, MAX_EVALUATIONS, MAX_ITERATIONS};
use crate::utils::config::SolverConfig;
use crate::validation::{BreakdownReason, NonConvergenceError};

/// Lower bound on the damping term so `λI` keeps the system positive definite
const MIN_DAMPING: f64 = 1e-12;

const DEFAULT_DAMPING_INCREASE: f64 = 10.0;
const DEFAULT_DAMPING_DECREASE: f64 = 0.1;

/// A vector-valued function with an analytic Jacobian
pub trait LeastSquaresProblem {
    /// Number of residuals `m`
    fn residual_count(&self) -> usize;

    /// Number of parameters `n`
    fn parameter_count(&self) -> usize;

    /// Residual vector, length `m`
    fn residuals(&self, point: &DVector<f64>) -> DVector<f64>;

    /// Jacobian, `m × n`
    fn jacobian(&self, point: &DVector<f64>) -> DMatrix<f64>;
}

/// Best point found by the engine and how it got there
#[derive(Debug, Clone, PartialEq)]
pub struct Optimum {
    pub point: DVector<f64>,
    /// `r(point) - target`, unweighted
    pub residuals: DVector<f64>,
    pub cost: f64,
    pub initial_cost: f64,
    pub iterations: u32,
    pub evaluations: u32,
    pub damping: f64,
    pub termination: Termination,
}

impl Optimum {
    pub fn converged(&self) -> bool {
        self.termination.is_converged()
    }
}

/// Levenberg-Marquardt optimizer settings
#[derive(Debug, Clone, PartialEq)]
pub struct LevenbergMarquardt {
    pub max_iterations: u32,
    pub max_evaluations: u32,
    /// Stop when an accepted step lowers the cost by less than this fraction
    pub cost_relative_tolerance: f64,
    /// Stop when `|Δ| <= tol * max(|p|, 1)`
    pub parameter_relative_tolerance: f64,
    pub initial_damping: f64,
    pub damping_increase: f64,
    pub damping_decrease: f64,
    /// Consecutive damping increases allowed within one iteration
    pub max_damping_retries: u32,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            max_evaluations: MAX_EVALUATIONS,
            cost_relative_tolerance: 1e-10,
            parameter_relative_tolerance: 1e-10,
            initial_damping: 1e-3,
            damping_increase: DEFAULT_DAMPING_INCREASE,
            damping_decrease: DEFAULT_DAMPING_DECREASE,
            max_damping_retries: 50,
        }
    }
}

impl From<&SolverConfig> for LevenbergMarquardt {
    fn from(config: &SolverConfig) -> Self {
        Self {
            max_iterations: config.max_iterations.min(MAX_ITERATIONS),
            max_evaluations: config.max_evaluations.min(MAX_EVALUATIONS),
            cost_relative_tolerance: config.cost_relative_tolerance,
            parameter_relative_tolerance: config.parameter_relative_tolerance,
            initial_damping: config.initial_damping,
            damping_increase: config.damping_increase,
            damping_decrease: config.damping_decrease,
            max_damping_retries: config.max_damping_retries,
        }
    }
}

impl LevenbergMarquardt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the damped iteration from `initial`
    ///
    /// `target` and `weights` must have `problem.residual_count()` entries and
    /// `initial` must have `problem.parameter_count()` entries. Hitting the
    /// iteration or evaluation cap returns the best point with a
    /// non-converged termination; only numerical breakdown is an error.
    ///
    /// Both caps are bounded by [`MAX_ITERATIONS`] and [`MAX_EVALUATIONS`]
    /// whatever the fields say. Damping factors outside their ranges (increase
    /// `> 1`, decrease in `(0, 1)`) fall back to the defaults.
    pub fn optimize<P: LeastSquaresProblem + ?Sized>(
        &self,
        problem: &P,
        target: &DVector<f64>,
        weights: &DVector<f64>,
        initial: DVector<f64>,
    ) -> Result<Optimum, NonConvergenceError> {
        debug_assert_eq!(target.len(), problem.residual_count());
        debug_assert_eq!(weights.len(), problem.residual_count());
        debug_assert_eq!(initial.len(), problem.parameter_count());

        let max_iterations = self.max_iterations.min(MAX_ITERATIONS);
        let max_evaluations = self.max_evaluations.min(MAX_EVALUATIONS);
        let damping_increase = if self.damping_increase.is_finite() && self.damping_increase > 1.0 {
            self.damping_increase
        } else {
            DEFAULT_DAMPING_INCREASE
        };
        let damping_decrease = if self.damping_decrease > 0.0 && self.damping_decrease < 1.0 {
            self.damping_decrease
        } else {
            DEFAULT_DAMPING_DECREASE
        };

        let parameters = initial.len();
        let weight_matrix = DMatrix::from_diagonal(weights);

        let mut point = initial;
        let mut residuals = problem.residuals(&point) - target;
        let mut evaluations: u32 = 1;
        let mut cost = weighted_cost(&residuals, weights);
        let initial_cost = cost;
        let mut damping = self.initial_damping;
        let mut iterations: u32 = 0;

        debug!(
            max_iterations,
            initial_point = ?point.as_slice(),
            initial_cost,
            "starting Levenberg-Marquardt"
        );

        if !cost.is_finite() {
            return Err(NonConvergenceError {
                iterations,
                evaluations,
                damping,
                reason: BreakdownReason::NonFiniteCost,
            });
        }

        let termination = 'outer: loop {
            if cost == 0.0 {
                break Termination::PerfectFit;
            }
            if iterations >= max_iterations {
                break Termination::MaxIterations;
            }
            iterations += 1;

            let jacobian = problem.jacobian(&point);
            let weighted_jt = jacobian.transpose() * &weight_matrix;
            let normal = &weighted_jt * &jacobian;
            let gradient = &weighted_jt * &residuals;
            if gradient.iter().all(|g| *g == 0.0) {
                break Termination::ZeroGradient;
            }
            let descent = -&gradient;
            let point_scale = point.norm().max(1.0);

            let mut retries: u32 = 0;
            loop {
                let mut augmented = normal.clone();
                for k in 0..parameters {
                    augmented[(k, k)] += damping;
                }
                let step = augmented
                    .cholesky()
                    .map(|factor| factor.solve(&descent))
                    .filter(|step| step.iter().all(|v| v.is_finite()));

                let Some(step) = step else {
                    retries += 1;
                    damping *= damping_increase;
                    trace!(iteration = iterations, damping, "damped system singular, increasing damping");
                    if retries > self.max_damping_retries {
                        return Err(NonConvergenceError {
                            iterations,
                            evaluations,
                            damping,
                            reason: BreakdownReason::SingularSystem,
                        });
                    }
                    continue;
                };

                let step_norm = step.norm();
                let small_step = step_norm <= self.parameter_relative_tolerance * point_scale;

                if evaluations >= max_evaluations {
                    break 'outer Termination::MaxEvaluations;
                }
                let candidate = &point + &step;
                let candidate_residuals = problem.residuals(&candidate) - target;
                evaluations += 1;
                let candidate_cost = weighted_cost(&candidate_residuals, weights);

                if candidate_cost.is_finite() && candidate_cost < cost {
                    let small_reduction = cost - candidate_cost <= self.cost_relative_tolerance * cost;
                    trace!(
                        iteration = iterations,
                        cost = candidate_cost,
                        step_norm,
                        damping,
                        "step accepted"
                    );
                    point = candidate;
                    residuals = candidate_residuals;
                    cost = candidate_cost;
                    damping = (damping * damping_decrease).max(MIN_DAMPING);
                    if small_step {
                        break 'outer Termination::StepTolerance;
                    }
                    if small_reduction {
                        break 'outer Termination::CostTolerance;
                    }
                    break;
                }

                trace!(
                    iteration = iterations,
                    rejected_cost = candidate_cost,
                    step_norm,
                    damping,
                    "step rejected"
                );
                // nothing left to gain at this resolution
                if small_step {
                    break 'outer Termination::StepTolerance;
                }
                retries += 1;
                damping *= damping_increase;
                if retries > self.max_damping_retries {
                    return Err(NonConvergenceError {
                        iterations,
                        evaluations,
                        damping,
                        reason: BreakdownReason::NoDescentStep,
                    });
                }
            }
        };

        if termination.is_converged() {
            debug!(iterations, evaluations, cost, %termination, "Levenberg-Marquardt finished");
        } else {
            warn!(iterations, evaluations, cost, %termination, "Levenberg-Marquardt stopped before converging");
        }

        Ok(Optimum {
            point,
            residuals,
            cost,
            initial_cost,
            iterations,
            evaluations,
            damping,
            termination,
        })
    }
}

/// `Σ w_i r_i²`
pub fn weighted_cost(residuals: &DVector<f64>, weights: &DVector<f64>) -> f64 {
    residuals
        .iter()
        .zip(weights.iter())
        .map(|(r, w)| w * r * r)
        .sum()
}
