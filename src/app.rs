//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads peak specs and pattern tables (or generates the demo scene)
//! - runs the batch fit
//! - prints reports
//! - writes optional exports

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Cli, Command, DemoArgs, FitArgs, InspectArgs};
use crate::domain::{DemoConfig, FitConfig, InspectConfig};
use crate::error::AppError;
use crate::fit::{FitOptions, FitSession};
use crate::io::ingest::RowError;

pub mod pipeline;

/// Entry point for the `pvfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Demo(args) => handle_demo(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;
    print_run(&run);
    write_exports(&run.session, &config.export_results, &config.export_outcomes)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = demo_config_from_args(&args);
    let run = pipeline::run_demo(&config)?;
    print_run(&run);
    write_exports(&run.session, &config.export_results, &config.export_outcomes)
}

fn handle_inspect(args: InspectArgs) -> Result<(), AppError> {
    let config = inspect_config_from_args(&args);
    let loaded = pipeline::run_inspect(&config)?;
    print_row_errors(&loaded.row_errors);
    println!("Table rows: {} read, {} used", loaded.rows_read, loaded.rows_used);

    // Reuse the session summary for the pattern header; nothing is fitted.
    let session = FitSession::new(loaded.pattern, FitOptions::default());
    println!("{}", session.describe());
    Ok(())
}

fn print_run(run: &pipeline::RunOutput) {
    print_row_errors(&run.row_errors);
    println!("{}", crate::report::format_batch(&run.report));
    println!("{}", run.session.describe());
}

fn print_row_errors(row_errors: &[RowError]) {
    if row_errors.is_empty() {
        return;
    }
    eprintln!("warning: {} pattern rows were rejected:", row_errors.len());
    eprint!("{}", crate::report::format_row_errors(row_errors, 10));
}

fn write_exports(
    session: &FitSession,
    results: &Option<PathBuf>,
    outcomes: &Option<PathBuf>,
) -> Result<(), AppError> {
    if let Some(path) = results {
        crate::io::export::write_results_csv(path, session.store().outcomes())?;
    }
    if let Some(path) = outcomes {
        crate::io::outcomes::write_outcomes_json(path, session.store().outcomes())?;
    }
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        pattern_path: args.pattern.clone(),
        peaks_path: args.peaks.clone(),
        cake: args.cake,
        delimiter: args.delimiter,
        direction: args.direction,
        first_cake_angle: args.first_cake_angle,
        max_iterations: args.max_iterations,
        export_results: args.export.clone(),
        export_outcomes: args.export_outcomes.clone(),
    }
}

pub fn demo_config_from_args(args: &DemoArgs) -> DemoConfig {
    DemoConfig {
        seed: args.seed,
        n_samples: args.samples,
        n_cakes: args.cakes,
        cake: args.cake,
        noise: args.noise,
        max_iterations: args.max_iterations,
        export_results: args.export.clone(),
        export_outcomes: args.export_outcomes.clone(),
    }
}

pub fn inspect_config_from_args(args: &InspectArgs) -> InspectConfig {
    InspectConfig {
        pattern_path: args.pattern.clone(),
        delimiter: args.delimiter,
        direction: args.direction,
        first_cake_angle: args.first_cake_angle,
    }
}
