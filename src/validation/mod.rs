//! Error taxonomy for model construction and solving

pub mod error;

pub use error::{
    BreakdownReason, InvalidModelError, NonConvergenceError, TrilaterationError,
    TrilaterationResult,
};
