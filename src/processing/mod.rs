//! Measurement input processing

pub mod parser;
pub mod ranging;

pub use parser::{parse_records, read_records, MeasurementRecord, ParseError};
pub use ranging::{select_most_certain, PathLossModel, RangingSample};
