//! Weighted nonlinear least-squares trilateration solver

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::algorithms::levenberg_marquardt::{LevenbergMarquardt, Optimum};
use crate::algorithms::residual::TrilaterationModel;
use crate::algorithms::weighting::WeightingPolicy;
use crate::core::Solution;
use crate::utils::config::SolverConfig;
use crate::validation::{InvalidModelError, TrilaterationResult};

/// Fits a point to a [`TrilaterationModel`] with a damped Gauss-Newton engine
///
/// The solver holds no per-solve state, so one instance can serve many
/// threads at once.
#[derive(Debug, Clone, Default)]
pub struct TrilaterationSolver {
    engine: LevenbergMarquardt,
}

impl TrilaterationSolver {
    /// Create a solver with the default engine settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `config` and build a solver from it
    pub fn with_config(config: &SolverConfig) -> TrilaterationResult<Self> {
        config.validate()?;
        Ok(Self {
            engine: LevenbergMarquardt::from(config),
        })
    }

    /// Use an explicitly configured engine
    ///
    /// The engine still bounds iterations and evaluations by the hard cap of 1000.
    pub fn with_engine(engine: LevenbergMarquardt) -> Self {
        Self { engine }
    }

    /// Engine settings used by every solve
    pub fn engine(&self) -> &LevenbergMarquardt {
        &self.engine
    }

    /// Estimate the point that best explains the model's distances
    ///
    /// Starts from `initial_point` when given, otherwise from the anchor
    /// centroid. The target is the zero vector since the residual already
    /// vanishes at a perfect fit.
    pub fn solve(
        &self,
        model: &TrilaterationModel,
        weighting: WeightingPolicy,
        initial_point: Option<&[f64]>,
    ) -> TrilaterationResult<Solution> {
        let initial = match initial_point {
            Some(point) => checked_initial_point(model, point)?,
            None => model.centroid(),
        };
        let target = DVector::zeros(model.anchor_count());
        let weights = weighting.weights(model);
        debug!(
            anchors = model.anchor_count(),
            dimension = model.dimension(),
            %weighting,
            "solving trilateration"
        );
        self.run(model, &target, &weights, initial)
    }

    /// Solve with an explicit target vector and diagonal weights
    pub fn solve_weighted(
        &self,
        model: &TrilaterationModel,
        target: &[f64],
        weights: &[f64],
        initial_point: &[f64],
    ) -> TrilaterationResult<Solution> {
        let anchors = model.anchor_count();
        if target.len() != anchors {
            return Err(InvalidModelError::LengthMismatch {
                field: "target",
                positions: anchors,
                actual: target.len(),
            }
            .into());
        }
        if weights.len() != anchors {
            return Err(InvalidModelError::LengthMismatch {
                field: "weights",
                positions: anchors,
                actual: weights.len(),
            }
            .into());
        }
        if let Some(index) = target.iter().position(|t| !t.is_finite()) {
            return Err(InvalidModelError::NonFiniteValue { field: "target", index }.into());
        }
        if let Some((index, value)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            return Err(InvalidModelError::InvalidWeight { index, value: *value }.into());
        }
        let initial = checked_initial_point(model, initial_point)?;
        self.run(
            model,
            &DVector::from_column_slice(target),
            &DVector::from_column_slice(weights),
            initial,
        )
    }

    /// Weighted cost `Σ w_i r_i²` of `point` under `weighting`
    pub fn cost_at(&self, model: &TrilaterationModel, weighting: WeightingPolicy, point: &[f64]) -> TrilaterationResult<f64> {
        let point = checked_initial_point(model, point)?;
        let residuals = model.residuals(&point);
        let weights = weighting.weights(model);
        Ok(crate::algorithms::levenberg_marquardt::weighted_cost(&residuals, &weights))
    }

    fn run(
        &self,
        model: &TrilaterationModel,
        target: &DVector<f64>,
        weights: &DVector<f64>,
        initial: DVector<f64>,
    ) -> TrilaterationResult<Solution> {
        let optimum = self.engine.optimize(model, target, weights, initial)?;
        let parameter_sigma = parameter_sigma(model, weights, &optimum.point);
        Ok(into_solution(optimum, parameter_sigma))
    }
}

/// Solve with the default engine settings
pub fn solve(
    model: &TrilaterationModel,
    weighting: WeightingPolicy,
    initial_point: Option<&[f64]>,
) -> TrilaterationResult<Solution> {
    TrilaterationSolver::new().solve(model, weighting, initial_point)
}

/// Build a model from raw measurements and solve it from the centroid
pub fn trilaterate<P: AsRef<[f64]>>(
    positions: &[P],
    distances: &[f64],
    sigma_positions: Option<&[f64]>,
    sigma_distances: Option<&[f64]>,
    weighting: WeightingPolicy,
) -> TrilaterationResult<Solution> {
    let model = TrilaterationModel::with_uncertainty(positions, distances, sigma_positions, sigma_distances)?;
    solve(&model, weighting, None)
}

fn checked_initial_point(model: &TrilaterationModel, point: &[f64]) -> Result<DVector<f64>, InvalidModelError> {
    if point.len() != model.dimension() {
        return Err(InvalidModelError::InitialPointDimension {
            expected: model.dimension(),
            actual: point.len(),
        });
    }
    if let Some(index) = point.iter().position(|v| !v.is_finite()) {
        return Err(InvalidModelError::NonFiniteValue {
            field: "initial_point",
            index,
        });
    }
    Ok(DVector::from_column_slice(point))
}

/// Square roots of the diagonal of `(JᵀWJ)⁻¹` at `point`
fn parameter_sigma(model: &TrilaterationModel, weights: &DVector<f64>, point: &DVector<f64>) -> Option<Vec<f64>> {
    let jacobian = model.jacobian(point);
    let normal: DMatrix<f64> = jacobian.transpose() * DMatrix::from_diagonal(weights) * &jacobian;
    let covariance = normal.try_inverse()?;
    covariance
        .diagonal()
        .iter()
        .map(|v| (v.is_finite() && *v >= 0.0).then(|| v.sqrt()))
        .collect()
}

fn into_solution(optimum: Optimum, parameter_sigma: Option<Vec<f64>>) -> Solution {
    let anchors = optimum.residuals.len().max(1);
    Solution {
        converged: optimum.converged(),
        point: optimum.point.as_slice().to_vec(),
        iterations: optimum.iterations,
        evaluations: optimum.evaluations,
        termination: optimum.termination,
        cost: optimum.cost,
        initial_cost: optimum.initial_cost,
        residual_norm: optimum.residuals.norm(),
        rms: (optimum.cost / anchors as f64).sqrt(),
        parameter_sigma,
    }
}
