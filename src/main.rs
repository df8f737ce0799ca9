//! trilaterate: command-line front end for the least-squares trilateration solver

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use nlls_trilateration::api::{CsvFormatter, JsonFormatter, OutputFormat, SolveRequest, TextFormatter};
use nlls_trilateration::{read_records, AccuracyValidator, SolverConfig, TrilaterationSolver, WeightingPolicy};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "trilaterate")]
#[command(about = "Estimate positions from anchor distances with weighted nonlinear least squares")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single JSON request
    Solve {
        /// Path to the request (positions, distances, optional sigmas).
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Solve every record of a measurement file and compare against ground truth
    Batch {
        /// Path to the blank-line separated record file.
        #[arg(long)]
        records: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// Weighting policy: std-dev, inverse-square, combined, or 0/1/2.
    #[arg(long)]
    weighting: Option<WeightingPolicy>,

    /// Solver configuration file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: text, json or csv.
    #[arg(long, default_value = "text")]
    format: OutputFormat,
}

impl CommonArgs {
    fn load_config(&self) -> CliResult<SolverConfig> {
        let mut config = match &self.config {
            Some(path) => SolverConfig::from_file(path)?,
            None => SolverConfig::default(),
        };
        if let Some(weighting) = self.weighting {
            config.weighting = weighting;
        }
        Ok(config)
    }
}

fn init_logging(debug_enabled: bool) {
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_solve(input: &Path, config: &SolverConfig, format: OutputFormat) -> CliResult<()> {
    let json = std::fs::read_to_string(input)?;
    let request = SolveRequest::from_json(&json)?;
    let solver = TrilaterationSolver::with_config(config)?;

    debug!(anchors = request.positions.len(), "loaded request from {}", input.display());
    let solution = request.execute(&solver, config.weighting)?;
    if !solution.converged {
        warn!(termination = %solution.termination, "solution did not converge");
    }

    let output = match format {
        OutputFormat::Text => TextFormatter::default().format_solution(&solution),
        OutputFormat::Json => JsonFormatter::pretty().format(&solution)?,
        OutputFormat::Csv => {
            let csv = CsvFormatter::default();
            format!(
                "{}\n{}",
                csv.solution_header(solution.dimension()),
                csv.format_solution(&solution)
            )
        }
    };
    println!("{}", output.trim_end());
    Ok(())
}

fn run_batch(records_path: &Path, config: &SolverConfig, format: OutputFormat) -> CliResult<()> {
    let records = read_records(records_path)?;
    let solver = TrilaterationSolver::with_config(config)?;
    info!(records = records.len(), weighting = %config.weighting, "evaluating {}", records_path.display());

    let mut validator = AccuracyValidator::new();
    validator.evaluate_records(&records, &solver, config.weighting);
    let report = validator.report(config.weighting);

    let output = match format {
        OutputFormat::Text => TextFormatter::default().format_report(&report),
        OutputFormat::Json => JsonFormatter::pretty().format(&report)?,
        OutputFormat::Csv => CsvFormatter::default().format_report(&report),
    };
    println!("{}", output.trim_end());

    info!(
        solved = report.statistics.sample_count,
        converged = report.statistics.converged_count,
        failed = report.failed,
        skipped = report.skipped,
        "batch complete"
    );
    Ok(())
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let common = match &cli.command {
        Commands::Solve { common, .. } | Commands::Batch { common, .. } => common,
    };
    let config = common.load_config()?;
    init_logging(cli.verbose || config.debug_logging);

    match &cli.command {
        Commands::Solve { input, common } => run_solve(input, &config, common.format),
        Commands::Batch { records, common } => run_batch(records, &config, common.format),
    }
}
