//! Request and output surfaces
//!
//! JSON solve requests and the text, JSON and CSV formatters used by the
//! command line tool.

pub mod types;
pub mod formatting;

pub use types::SolveRequest;
pub use formatting::{CsvFormatter, JsonFormatter, OutputFormat, TextFormatter};
