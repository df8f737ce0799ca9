//! Output formatting for solutions and batch evaluations
//!
//! Human-readable text, JSON and CSV renderings used by the command line
//! tool. Each formatter handles both a single [`Solution`] and a full
//! [`EvaluationReport`].

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::accuracy_validation::EvaluationReport;
use crate::core::Solution;
use crate::utils::config::ConfigError;

/// Output format selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(ConfigError::InvalidParameter {
                parameter: "format",
                value: s.to_string(),
                reason: "expected one of text, json, csv",
            }),
        }
    }
}

/// Human-readable text formatter
#[derive(Debug, Clone)]
pub struct TextFormatter {
    /// Decimal places for coordinates and errors
    pub precision: usize,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self { precision: 6 }
    }
}

impl TextFormatter {
    pub fn format_solution(&self, solution: &Solution) -> String {
        let p = self.precision;
        let mut out = format!("Position: {}\n", join(&solution.point, p, ", "));
        out.push_str(&format!(
            "Status: {} ({})\n",
            if solution.converged { "converged" } else { "not converged" },
            solution.termination
        ));
        out.push_str(&format!(
            "Iterations: {}, evaluations: {}\n",
            solution.iterations, solution.evaluations
        ));
        out.push_str(&format!(
            "Cost: {:.3e} (initial {:.3e}), RMS residual: {:.p$}\n",
            solution.cost, solution.initial_cost, solution.rms
        ));
        if let Some(sigma) = &solution.parameter_sigma {
            out.push_str(&format!("Parameter sigma: {}\n", join(sigma, p, ", ")));
        }
        out
    }

    pub fn format_report(&self, report: &EvaluationReport) -> String {
        let p = self.precision;
        let mut out = String::new();
        for error in &report.errors {
            out.push_str(&format!(
                "line {:>5}  true [{}]  estimated [{}]  error {:.p$}  iterations {}{}\n",
                error.line,
                join(&error.true_position, p, ", "),
                join(&error.estimated_position, p, ", "),
                error.error_magnitude,
                error.iterations,
                if error.converged { "" } else { "  (not converged)" },
            ));
        }

        let stats = &report.statistics;
        out.push_str(&format!("\nWeighting: {}\n", report.weighting));
        out.push_str(&format!(
            "Records: {} solved, {} converged, {} failed, {} skipped\n",
            stats.sample_count, stats.converged_count, report.failed, report.skipped
        ));
        if stats.sample_count > 0 {
            out.push_str(&format!("Mean error: {:.p$}\n", stats.mean_error));
            out.push_str(&format!("Std dev: {:.p$}\n", stats.std_dev_error));
            out.push_str(&format!("RMSE: {:.p$}\n", stats.rmse));
            out.push_str(&format!("95th percentile: {:.p$}\n", stats.error_95_percentile));
            out.push_str(&format!("Min / max: {:.p$} / {:.p$}\n", stats.min_error, stats.max_error));
        }
        out
    }
}

/// JSON formatter
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn format<T: Serialize>(&self, value: &T) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }
}

/// CSV formatter, one row per solution or record
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    pub delimiter: char,
    pub precision: usize,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self {
            delimiter: ',',
            precision: 6,
        }
    }
}

impl CsvFormatter {
    /// Header for [`format_solution`](Self::format_solution) rows of the given dimension
    pub fn solution_header(&self, dimension: usize) -> String {
        let mut columns: Vec<String> = (0..dimension).map(|i| format!("x{i}")).collect();
        columns.extend(
            ["converged", "termination", "iterations", "evaluations", "cost", "rms"]
                .iter()
                .map(|c| c.to_string()),
        );
        columns.join(&self.delimiter.to_string())
    }

    pub fn format_solution(&self, solution: &Solution) -> String {
        let d = self.delimiter.to_string();
        let p = self.precision;
        [
            join(&solution.point, p, &d),
            solution.converged.to_string(),
            solution.termination.to_string(),
            solution.iterations.to_string(),
            solution.evaluations.to_string(),
            format!("{:e}", solution.cost),
            format!("{:.p$}", solution.rms),
        ]
        .join(&d)
    }

    /// Header for report rows of the given dimension
    pub fn report_header(&self, dimension: usize) -> String {
        let mut columns = vec!["line".to_string()];
        columns.extend((0..dimension).map(|i| format!("true_x{i}")));
        columns.extend((0..dimension).map(|i| format!("est_x{i}")));
        columns.extend(
            ["error", "anchors", "iterations", "converged"]
                .iter()
                .map(|c| c.to_string()),
        );
        columns.join(&self.delimiter.to_string())
    }

    /// One row per solved record, preceded by a header
    ///
    /// A new header is written whenever the record dimension changes, so
    /// every row matches the header above it.
    pub fn format_report(&self, report: &EvaluationReport) -> String {
        let d = self.delimiter.to_string();
        let p = self.precision;
        let mut out = String::new();
        let mut dimension = None;
        for error in &report.errors {
            if dimension != Some(error.true_position.len()) {
                dimension = Some(error.true_position.len());
                out.push_str(&self.report_header(error.true_position.len()));
                out.push('\n');
            }
            let row = [
                error.line.to_string(),
                join(&error.true_position, p, &d),
                join(&error.estimated_position, p, &d),
                format!("{:.p$}", error.error_magnitude),
                error.num_anchors.to_string(),
                error.iterations.to_string(),
                error.converged.to_string(),
            ];
            out.push_str(&row.join(&d));
            out.push('\n');
        }
        out
    }
}

fn join(values: &[f64], precision: usize, separator: &str) -> String {
    values
        .iter()
        .map(|v| format!("{v:.precision$}"))
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accuracy_validation::{AccuracyStatistics, PositionError};
    use crate::algorithms::weighting::WeightingPolicy;
    use crate::core::Termination;

    fn solution() -> Solution {
        Solution {
            point: vec![3.0, 4.0],
            iterations: 5,
            evaluations: 7,
            converged: true,
            termination: Termination::CostTolerance,
            cost: 1e-20,
            initial_cost: 12.5,
            residual_norm: 1e-10,
            rms: 0.0,
            parameter_sigma: None,
        }
    }

    fn report() -> EvaluationReport {
        EvaluationReport {
            weighting: WeightingPolicy::Combined,
            errors: vec![PositionError {
                line: 3,
                true_position: vec![1.0, 2.0],
                estimated_position: vec![1.5, 2.0],
                error_magnitude: 0.5,
                num_anchors: 4,
                iterations: 6,
                converged: true,
            }],
            statistics: AccuracyStatistics {
                mean_error: 0.5,
                rmse: 0.5,
                error_95_percentile: 0.5,
                max_error: 0.5,
                min_error: 0.5,
                sample_count: 1,
                converged_count: 1,
                ..AccuracyStatistics::default()
            },
            failed: 0,
            skipped: 2,
        }
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_text_solution() {
        let text = TextFormatter { precision: 2 }.format_solution(&solution());
        assert!(text.starts_with("Position: 3.00, 4.00\n"));
        assert!(text.contains("Status: converged (cost tolerance reached)"));
        assert!(text.contains("Iterations: 5, evaluations: 7"));
    }

    #[test]
    fn test_text_report_summary() {
        let text = TextFormatter { precision: 3 }.format_report(&report());
        assert!(text.contains("error 0.500"));
        assert!(text.contains("Records: 1 solved, 1 converged, 0 failed, 2 skipped"));
        assert!(text.contains("RMSE: 0.500"));
    }

    #[test]
    fn test_csv_solution_row() {
        let csv = CsvFormatter { delimiter: ';', precision: 1 };
        assert_eq!(
            csv.solution_header(2),
            "x0;x1;converged;termination;iterations;evaluations;cost;rms"
        );
        let row = csv.format_solution(&solution());
        assert!(row.starts_with("3.0;4.0;true;"));
        assert_eq!(row.split(';').count(), 8);
    }

    #[test]
    fn test_csv_report() {
        let csv = CsvFormatter::default().format_report(&report());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "line,true_x0,true_x1,est_x0,est_x1,error,anchors,iterations,converged");
        assert_eq!(lines[1], "3,1.000000,2.000000,1.500000,2.000000,0.500000,4,6,true");
    }

    #[test]
    fn test_json_report_round_trips() {
        let json = JsonFormatter::pretty().format(&report()).unwrap();
        let parsed: EvaluationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report());
    }

    #[test]
    fn test_csv_report_mixed_dimensions() {
        let mut report = report();
        report.errors.push(PositionError {
            line: 9,
            true_position: vec![1.0, 2.0, 3.0],
            estimated_position: vec![1.0, 2.0, 3.5],
            error_magnitude: 0.5,
            num_anchors: 4,
            iterations: 3,
            converged: true,
        });
        let csv = CsvFormatter { delimiter: ',', precision: 1 }.format_report(&report);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "line,true_x0,true_x1,true_x2,est_x0,est_x1,est_x2,error,anchors,iterations,converged");
        assert_eq!(lines[3], "9,1.0,2.0,3.0,1.0,2.0,3.5,0.5,4,3,true");
        for pair in [(0, 1), (2, 3)] {
            assert_eq!(lines[pair.0].split(',').count(), lines[pair.1].split(',').count());
        }
    }

    #[test]
    fn test_csv_empty_report() {
        let mut report = report();
        report.errors.clear();
        assert_eq!(CsvFormatter::default().format_report(&report), "");
    }
}
