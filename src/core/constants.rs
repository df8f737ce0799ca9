//! Numerical constants shared by the model and the solver

/// Floor applied to distances and standard deviations before they are stored
pub const EPSILON: f64 = 1e-7;

/// Minimum number of anchors a model accepts
pub const MIN_ANCHORS: usize = 2;

/// Hard cap on solver iterations; residual evaluations share the same ceiling
pub const MAX_ITERATIONS: u32 = 1000;

/// Hard cap on residual evaluations
pub const MAX_EVALUATIONS: u32 = MAX_ITERATIONS;
