//! Residual model for range-based trilateration
//!
//! Each anchor contributes one residual, the squared Euclidean distance from
//! the candidate point to the anchor minus the squared measured distance:
//!
//! ```text
//! r_i(p) = Σ_j (p_j - a_ij)² - d_i²
//! J_ij(p) = 2 p_j - 2 a_ij
//! ```
//!
//! The squared form is kept on purpose. Switching to `|p - a| - d` changes the
//! convergence basin and what the weights mean.

use nalgebra::{DMatrix, DVector};

use crate::algorithms::levenberg_marquardt::LeastSquaresProblem;
use crate::core::{EPSILON, MIN_ANCHORS};
use crate::validation::InvalidModelError;

/// Anchor positions, measured distances and their uncertainties
///
/// Distances and sigmas are clamped to at least [`EPSILON`] on construction.
/// The clamp is lossy: a measured distance of `0.0` is stored as `1e-7`. The
/// caller's slices are copied, never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct TrilaterationModel {
    /// One row per anchor
    positions: DMatrix<f64>,
    distances: DVector<f64>,
    sigma_positions: DVector<f64>,
    sigma_distances: DVector<f64>,
}

impl TrilaterationModel {
    /// Build a model with zero (clamped) uncertainty for every anchor
    pub fn new<P: AsRef<[f64]>>(positions: &[P], distances: &[f64]) -> Result<Self, InvalidModelError> {
        Self::with_uncertainty(positions, distances, None, None)
    }

    /// Build a model with optional per-anchor position and distance sigmas
    pub fn with_uncertainty<P: AsRef<[f64]>>(
        positions: &[P],
        distances: &[f64],
        sigma_positions: Option<&[f64]>,
        sigma_distances: Option<&[f64]>,
    ) -> Result<Self, InvalidModelError> {
        let anchors = positions.len();
        if anchors < MIN_ANCHORS {
            return Err(InvalidModelError::TooFewAnchors {
                required: MIN_ANCHORS,
                actual: anchors,
            });
        }
        check_length("distances", anchors, distances.len())?;
        if let Some(sigmas) = sigma_positions {
            check_length("sigma_positions", anchors, sigmas.len())?;
        }
        if let Some(sigmas) = sigma_distances {
            check_length("sigma_distances", anchors, sigmas.len())?;
        }

        let dimension = positions[0].as_ref().len();
        if dimension == 0 {
            return Err(InvalidModelError::ZeroDimension);
        }
        for (index, position) in positions.iter().enumerate() {
            let position = position.as_ref();
            if position.len() != dimension {
                return Err(InvalidModelError::DimensionMismatch {
                    index,
                    expected: dimension,
                    actual: position.len(),
                });
            }
            if !position.iter().all(|v| v.is_finite()) {
                return Err(InvalidModelError::NonFiniteValue {
                    field: "positions",
                    index,
                });
            }
        }

        let positions = DMatrix::from_fn(anchors, dimension, |i, j| positions[i].as_ref()[j]);
        let distances = clamped("distances", distances)?;
        let sigma_positions = match sigma_positions {
            Some(sigmas) => clamped("sigma_positions", sigmas)?,
            None => DVector::from_element(anchors, EPSILON),
        };
        let sigma_distances = match sigma_distances {
            Some(sigmas) => clamped("sigma_distances", sigmas)?,
            None => DVector::from_element(anchors, EPSILON),
        };

        Ok(Self {
            positions,
            distances,
            sigma_positions,
            sigma_distances,
        })
    }

    /// Number of anchors `N`
    pub fn anchor_count(&self) -> usize {
        self.positions.nrows()
    }

    /// Coordinate dimension `D` shared by all anchors
    pub fn dimension(&self) -> usize {
        self.positions.ncols()
    }

    /// Anchor positions, one row per anchor
    pub fn positions(&self) -> &DMatrix<f64> {
        &self.positions
    }

    /// Measured distances after clamping to `EPSILON`
    pub fn distances(&self) -> &DVector<f64> {
        &self.distances
    }

    /// Per-anchor position standard deviations after clamping
    pub fn sigma_positions(&self) -> &DVector<f64> {
        &self.sigma_positions
    }

    /// Per-anchor distance standard deviations after clamping
    pub fn sigma_distances(&self) -> &DVector<f64> {
        &self.sigma_distances
    }

    /// Coordinate-wise mean of the anchor positions
    pub fn centroid(&self) -> DVector<f64> {
        let sum = self
            .positions
            .row_iter()
            .fold(DVector::zeros(self.dimension()), |acc, row| acc + row.transpose());
        sum / self.anchor_count() as f64
    }

    /// Squared-distance residual for every anchor at `point`
    pub fn residuals(&self, point: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(self.anchor_count(), |i, _| {
            let squared: f64 = (0..self.dimension())
                .map(|j| {
                    let diff = point[j] - self.positions[(i, j)];
                    diff * diff
                })
                .sum();
            squared - self.distances[i] * self.distances[i]
        })
    }

    /// Analytic Jacobian of [`residuals`](Self::residuals) at `point`
    pub fn jacobian(&self, point: &DVector<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(self.anchor_count(), self.dimension(), |i, j| {
            2.0 * point[j] - 2.0 * self.positions[(i, j)]
        })
    }
}

impl LeastSquaresProblem for TrilaterationModel {
    fn residual_count(&self) -> usize {
        self.anchor_count()
    }

    fn parameter_count(&self) -> usize {
        self.dimension()
    }

    fn residuals(&self, point: &DVector<f64>) -> DVector<f64> {
        TrilaterationModel::residuals(self, point)
    }

    fn jacobian(&self, point: &DVector<f64>) -> DMatrix<f64> {
        TrilaterationModel::jacobian(self, point)
    }
}

/// Build a model; free-function form of [`TrilaterationModel::with_uncertainty`]
pub fn build_model<P: AsRef<[f64]>>(
    positions: &[P],
    distances: &[f64],
    sigma_positions: Option<&[f64]>,
    sigma_distances: Option<&[f64]>,
) -> Result<TrilaterationModel, InvalidModelError> {
    TrilaterationModel::with_uncertainty(positions, distances, sigma_positions, sigma_distances)
}

fn check_length(field: &'static str, positions: usize, actual: usize) -> Result<(), InvalidModelError> {
    if positions != actual {
        return Err(InvalidModelError::LengthMismatch {
            field,
            positions,
            actual,
        });
    }
    Ok(())
}

fn clamped(field: &'static str, values: &[f64]) -> Result<DVector<f64>, InvalidModelError> {
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(InvalidModelError::NonFiniteValue { field, index });
    }
    Ok(DVector::from_iterator(
        values.len(),
        values.iter().map(|v| v.max(EPSILON)),
    ))
}
