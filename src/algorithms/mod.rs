//! Trilateration model, weighting and the least-squares solver

pub mod residual;
pub mod weighting;
pub mod levenberg_marquardt;
pub mod solver;

pub use residual::{build_model, TrilaterationModel};
pub use weighting::WeightingPolicy;
pub use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, Optimum};
pub use solver::{solve, trilaterate, TrilaterationSolver};
