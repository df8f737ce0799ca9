//! Weighted nonlinear least-squares trilateration
//!
//! Estimates a point in any number of dimensions from distance measurements
//! to anchors at known positions. The residual model lives in
//! [`algorithms::residual`], the per-anchor weighting policies in
//! [`algorithms::weighting`], and the damped Gauss-Newton (Levenberg-Marquardt)
//! engine that ties them together in [`algorithms::solver`].
//!
//! ```no_run
//! use nlls_trilateration::{trilaterate, WeightingPolicy};
//!
//! let positions = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]];
//! let distances = [5.0, 65.0_f64.sqrt(), 45.0_f64.sqrt()];
//! let solution = trilaterate(&positions, &distances, None, None, WeightingPolicy::StdDevWeight)?;
//! println!("{:?} after {} iterations", solution.point, solution.iterations);
//! # Ok::<(), nlls_trilateration::TrilaterationError>(())
//! ```

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod api;
pub mod accuracy_validation;

// Re-export commonly used types
pub use core::{Solution, Termination, EPSILON, MAX_ITERATIONS, MIN_ANCHORS};
pub use algorithms::{
    build_model, solve, trilaterate, LeastSquaresProblem, LevenbergMarquardt, Optimum,
    TrilaterationModel, TrilaterationSolver, WeightingPolicy,
};
pub use validation::{
    BreakdownReason, InvalidModelError, NonConvergenceError, TrilaterationError, TrilaterationResult,
};
pub use utils::{ConfigError, SolverConfig};
pub use processing::{parse_records, read_records, MeasurementRecord, ParseError, PathLossModel, RangingSample};
pub use api::{OutputFormat, SolveRequest};
pub use accuracy_validation::{AccuracyStatistics, AccuracyValidator, EvaluationReport, PositionError};
