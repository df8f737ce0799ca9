use std::fmt;
use thiserror::Error;

use crate::processing::parser::ParseError;
use crate::utils::config::ConfigError;

/// Result alias used throughout the crate
pub type TrilaterationResult<T> = Result<T, TrilaterationError>;

/// Malformed input detected while building a model or preparing a solve
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidModelError {
    #[error("need at least {required} positions, got {actual}")]
    TooFewAnchors { required: usize, actual: usize },

    #[error("the number of positions you provided, {positions}, does not match the number of {field}, {actual}")]
    LengthMismatch {
        field: &'static str,
        positions: usize,
        actual: usize,
    },

    #[error("position {index} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("positions must have at least one coordinate")]
    ZeroDimension,

    #[error("non-finite value in {field} at index {index}")]
    NonFiniteValue { field: &'static str, index: usize },

    #[error("initial point has dimension {actual}, expected {expected}")]
    InitialPointDimension { expected: usize, actual: usize },

    #[error("weight {index} is {value}, weights must be finite and non-negative")]
    InvalidWeight { index: usize, value: f64 },
}

/// Kind of numerical breakdown that stopped the optimizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownReason {
    /// The damped normal matrix stayed singular
    SingularSystem,
    /// No cost-decreasing step was found
    NoDescentStep,
    /// The weighted cost is not finite
    NonFiniteCost,
}

impl fmt::Display for BreakdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakdownReason::SingularSystem => write!(f, "normal equations remained singular"),
            BreakdownReason::NoDescentStep => write!(f, "no cost-decreasing step found"),
            BreakdownReason::NonFiniteCost => write!(f, "weighted cost is not finite"),
        }
    }
}

/// The solver exhausted its damping retries without making progress
#[derive(Debug, Clone, PartialEq, Error)]
#[error("solver failed after {iterations} iterations and {evaluations} evaluations (damping {damping:e}): {reason}")]
pub struct NonConvergenceError {
    pub iterations: u32,
    pub evaluations: u32,
    pub damping: f64,
    pub reason: BreakdownReason,
}

/// Umbrella error for every fallible operation in the crate
#[derive(Debug, Error)]
pub enum TrilaterationError {
    #[error("invalid model: {0}")]
    InvalidModel(#[from] InvalidModelError),

    #[error(transparent)]
    NonConvergence(#[from] NonConvergenceError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("record parse error: {0}")]
    Parse(#[from] ParseError),
}

impl TrilaterationError {
    /// True for malformed-input errors, which callers should not retry
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, TrilaterationError::InvalidModel(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_message() {
        let err = InvalidModelError::LengthMismatch {
            field: "distances",
            positions: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "the number of positions you provided, 3, does not match the number of distances, 2"
        );
    }

    #[test]
    fn test_umbrella_conversion() {
        let err: TrilaterationError = InvalidModelError::ZeroDimension.into();
        assert!(err.is_invalid_input());

        let err: TrilaterationError = NonConvergenceError {
            iterations: 4,
            evaluations: 9,
            damping: 1e12,
            reason: BreakdownReason::SingularSystem,
        }
        .into();
        assert!(!err.is_invalid_input());
        assert!(err.to_string().contains("remained singular"));
    }
}
