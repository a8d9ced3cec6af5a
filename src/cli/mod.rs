//! Command-line parsing for the peak fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{CakeDirection, Delimiter};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "pvfit",
    version,
    about = "Pseudo-Voigt peak fitting for caked diffraction patterns"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit peak specs against one cake of a pattern file and print results.
    Fit(FitArgs),
    /// Fit a built-in synthetic pattern (no input files needed).
    Demo(DemoArgs),
    /// Print a pattern file's structure without fitting anything.
    Inspect(InspectArgs),
}

/// Options for fitting a pattern file.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Pattern table: first column two-theta, one further column per cake.
    #[arg(short = 'p', long, value_name = "FILE")]
    pub pattern: PathBuf,

    /// Peak spec JSON file.
    #[arg(short = 'k', long, value_name = "JSON")]
    pub peaks: PathBuf,

    /// One-based cake column to fit.
    #[arg(short = 'c', long, default_value_t = 1)]
    pub cake: usize,

    /// Column delimiter of the pattern table.
    #[arg(long, value_enum, default_value_t = Delimiter::Whitespace)]
    pub delimiter: Delimiter,

    /// Direction the cake columns advance around the azimuth.
    #[arg(long, value_enum, default_value_t = CakeDirection::Clockwise)]
    pub direction: CakeDirection,

    /// Azimuthal angle (degrees) of the first cake column.
    #[arg(long, default_value_t = 90.0)]
    pub first_cake_angle: f64,

    /// Iteration budget per peak window.
    #[arg(long, default_value_t = 200)]
    pub max_iterations: usize,

    /// Export per-maximum results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export full outcomes (parameters, errors, curves) to JSON.
    #[arg(long = "export-outcomes")]
    pub export_outcomes: Option<PathBuf>,
}

/// Options for the synthetic demo run.
#[derive(Debug, Parser, Clone)]
pub struct DemoArgs {
    /// Random seed for the synthetic pattern.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Samples along the two-theta axis.
    #[arg(long, default_value_t = 501)]
    pub samples: usize,

    /// Number of cakes to generate.
    #[arg(long, default_value_t = 8)]
    pub cakes: usize,

    /// One-based cake column to fit.
    #[arg(short = 'c', long, default_value_t = 1)]
    pub cake: usize,

    /// Standard deviation of the additive Gaussian noise.
    #[arg(long, default_value_t = 0.3)]
    pub noise: f64,

    /// Iteration budget per peak window.
    #[arg(long, default_value_t = 200)]
    pub max_iterations: usize,

    /// Export per-maximum results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export full outcomes (parameters, errors, curves) to JSON.
    #[arg(long = "export-outcomes")]
    pub export_outcomes: Option<PathBuf>,
}

/// Options for inspecting a pattern file.
#[derive(Debug, Parser)]
pub struct InspectArgs {
    /// Pattern table: first column two-theta, one further column per cake.
    #[arg(short = 'p', long, value_name = "FILE")]
    pub pattern: PathBuf,

    /// Column delimiter of the pattern table.
    #[arg(long, value_enum, default_value_t = Delimiter::Whitespace)]
    pub delimiter: Delimiter,

    /// Direction the cake columns advance around the azimuth.
    #[arg(long, value_enum, default_value_t = CakeDirection::Clockwise)]
    pub direction: CakeDirection,

    /// Azimuthal angle (degrees) of the first cake column.
    #[arg(long, default_value_t = 90.0)]
    pub first_cake_angle: f64,
}
