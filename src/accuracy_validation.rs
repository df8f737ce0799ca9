//! Accuracy evaluation of solved positions against surveyed ground truth
//!
//! Used by the batch mode of the command line tool: every recorded fix is
//! solved, compared to its true position, and the errors are summarised.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::algorithms::solver::TrilaterationSolver;
use crate::algorithms::weighting::WeightingPolicy;
use crate::core::{Solution, MIN_ANCHORS};
use crate::processing::parser::MeasurementRecord;
use crate::validation::TrilaterationError;

/// Position error of one solved record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionError {
    /// Line where the record starts in its source file
    pub line: usize,
    pub true_position: Vec<f64>,
    pub estimated_position: Vec<f64>,
    /// Euclidean distance between estimate and truth
    pub error_magnitude: f64,
    pub num_anchors: usize,
    pub iterations: u32,
    pub converged: bool,
}

/// Accuracy statistics over multiple records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStatistics {
    pub mean_error: f64,
    /// Population standard deviation of the error magnitude
    pub std_dev_error: f64,
    /// 95th percentile, nearest-rank
    pub error_95_percentile: f64,
    /// Root Mean Square Error (RMSE)
    pub rmse: f64,
    pub max_error: f64,
    pub min_error: f64,
    pub sample_count: usize,
    /// Samples whose solve reported convergence
    pub converged_count: usize,
}

/// Everything a batch evaluation produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub weighting: WeightingPolicy,
    pub errors: Vec<PositionError>,
    pub statistics: AccuracyStatistics,
    /// Records whose solve returned an error
    pub failed: usize,
    /// Records with too few anchors to solve
    pub skipped: usize,
}

/// Collects position errors and summarises them
#[derive(Debug, Clone, Default)]
pub struct AccuracyValidator {
    errors: Vec<PositionError>,
    failed: usize,
    skipped: usize,
}

impl AccuracyValidator {
    /// Create a new accuracy validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a solution against the record's true position
    pub fn calculate_position_error(&self, record: &MeasurementRecord, solution: &Solution) -> PositionError {
        PositionError {
            line: record.line,
            true_position: record.true_position.clone(),
            estimated_position: solution.point.clone(),
            error_magnitude: solution.distance_to(&record.true_position),
            num_anchors: record.anchor_count(),
            iterations: solution.iterations,
            converged: solution.converged,
        }
    }

    /// Add a position error to the collected history
    pub fn add_error(&mut self, error: PositionError) {
        self.errors.push(error);
    }

    /// Errors collected so far, in record order
    pub fn errors(&self) -> &[PositionError] {
        &self.errors
    }

    /// Number of records whose solve returned an error
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Number of records skipped for having too few anchors
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Solve every record and collect its error
    ///
    /// Records with fewer than two anchors are skipped, and records whose
    /// solve fails are counted; neither stops the evaluation.
    pub fn evaluate_records(
        &mut self,
        records: &[MeasurementRecord],
        solver: &TrilaterationSolver,
        weighting: WeightingPolicy,
    ) {
        for record in records {
            if record.anchor_count() < MIN_ANCHORS {
                warn!(line = record.line, anchors = record.anchor_count(), "skipping record with too few anchors");
                self.skipped += 1;
                continue;
            }
            let solution = record
                .to_model()
                .map_err(TrilaterationError::from)
                .and_then(|model| solver.solve(&model, weighting, None));
            match solution {
                Ok(solution) => {
                    let error = self.calculate_position_error(record, &solution);
                    debug!(
                        line = record.line,
                        error = error.error_magnitude,
                        iterations = solution.iterations,
                        "record solved"
                    );
                    self.add_error(error);
                }
                Err(err) => {
                    warn!(line = record.line, error = %err, "record failed to solve");
                    self.failed += 1;
                }
            }
        }
    }

    /// Calculate accuracy statistics over the collected errors
    pub fn calculate_statistics(&self) -> AccuracyStatistics {
        if self.errors.is_empty() {
            return AccuracyStatistics::default();
        }

        let n = self.errors.len();
        let magnitudes: Vec<f64> = self.errors.iter().map(|e| e.error_magnitude).collect();

        let mean_error = magnitudes.iter().sum::<f64>() / n as f64;
        let rmse = (magnitudes.iter().map(|e| e.powi(2)).sum::<f64>() / n as f64).sqrt();
        let variance = magnitudes.iter().map(|e| (e - mean_error).powi(2)).sum::<f64>() / n as f64;

        let max_error = magnitudes.iter().copied().fold(0.0, f64::max);
        let min_error = magnitudes.iter().copied().fold(f64::INFINITY, f64::min);

        let mut sorted = magnitudes;
        sorted.sort_by(|a, b| a.total_cmp(b));
        let index_95 = ((n as f64 * 0.95).ceil() as usize).saturating_sub(1).min(n - 1);

        AccuracyStatistics {
            mean_error,
            std_dev_error: variance.sqrt(),
            error_95_percentile: sorted[index_95],
            rmse,
            max_error,
            min_error,
            sample_count: n,
            converged_count: self.errors.iter().filter(|e| e.converged).count(),
        }
    }

    /// Snapshot of the collected errors and their statistics
    pub fn report(&self, weighting: WeightingPolicy) -> EvaluationReport {
        EvaluationReport {
            weighting,
            errors: self.errors.clone(),
            statistics: self.calculate_statistics(),
            failed: self.failed,
            skipped: self.skipped,
        }
    }
}
