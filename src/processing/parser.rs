//! Reader for recorded ranging sessions
//!
//! A record file holds one record per block of lines, blocks separated by
//! blank lines. Each line is one anchor observation:
//!
//! ```text
//! true_1 .. true_D   anchor_1 .. anchor_D   distance
//! ```
//!
//! Columns are separated by tabs or spaces and may use a decimal comma.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::algorithms::residual::TrilaterationModel;
use crate::validation::InvalidModelError;

/// Errors raised while reading a record file
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: expected an odd number of at least 3 columns, found {count}")]
    InvalidColumnCount { line: usize, count: usize },

    #[error("line {line}, column {column}: '{value}' is not a number")]
    InvalidNumber {
        line: usize,
        column: usize,
        value: String,
    },

    #[error("line {line}: dimension {actual} does not match dimension {expected} of its record")]
    InconsistentDimension {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One recorded position fix: the surveyed true position and the ranges taken there
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    /// 1-based line number where the record starts
    pub line: usize,
    pub true_position: Vec<f64>,
    pub positions: Vec<Vec<f64>>,
    pub distances: Vec<f64>,
}

impl MeasurementRecord {
    /// Number of anchor observations in the record
    pub fn anchor_count(&self) -> usize {
        self.positions.len()
    }

    /// Coordinate dimension of the record
    pub fn dimension(&self) -> usize {
        self.true_position.len()
    }

    /// Build a residual model from the record's anchors
    pub fn to_model(&self) -> Result<TrilaterationModel, InvalidModelError> {
        TrilaterationModel::new(&self.positions, &self.distances)
    }
}

/// Read and parse a record file
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<MeasurementRecord>, ParseError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(&content)
}

/// Parse records from text
pub fn parse_records(input: &str) -> Result<Vec<MeasurementRecord>, ParseError> {
    let mut records = Vec::new();
    let mut current: Option<MeasurementRecord> = None;

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            if let Some(record) = current.take() {
                records.push(record);
            }
            continue;
        }

        let values = parse_line(trimmed, line)?;
        let dimension = (values.len() - 1) / 2;
        let anchor = values[dimension..2 * dimension].to_vec();
        let distance = values[2 * dimension];

        match current.as_mut() {
            Some(record) => {
                if record.dimension() != dimension {
                    return Err(ParseError::InconsistentDimension {
                        line,
                        expected: record.dimension(),
                        actual: dimension,
                    });
                }
                record.positions.push(anchor);
                record.distances.push(distance);
            }
            None => {
                current = Some(MeasurementRecord {
                    line,
                    true_position: values[..dimension].to_vec(),
                    positions: vec![anchor],
                    distances: vec![distance],
                });
            }
        }
    }
    if let Some(record) = current {
        records.push(record);
    }
    Ok(records)
}

fn parse_line(line_text: &str, line: usize) -> Result<Vec<f64>, ParseError> {
    let columns: Vec<&str> = line_text.split_whitespace().collect();
    if columns.len() < 3 || columns.len() % 2 == 0 {
        return Err(ParseError::InvalidColumnCount {
            line,
            count: columns.len(),
        });
    }
    columns
        .iter()
        .enumerate()
        .map(|(column, text)| {
            text.replace(',', ".")
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidNumber {
                    line,
                    column: column + 1,
                    value: (*text).to_string(),
                })
        })
        .collect()
}
