//! Shared fit pipeline behind the CLI commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load specs -> load/generate pattern -> session -> batch fit
//!
//! The CLI layer can then focus on presentation (printing vs exports).

use crate::data::synthetic;
use crate::domain::{DemoConfig, FitConfig, InspectConfig};
use crate::error::AppError;
use crate::fit::{BatchReport, FitOptions, FitSession};
use crate::io::ingest::{self, LoadedPattern, RowError};
use crate::io::peaks;

/// All computed outputs of a single fitting run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub session: FitSession,
    pub report: BatchReport,
    /// Pattern rows rejected during ingest (empty for synthetic runs).
    pub row_errors: Vec<RowError>,
}

/// Fit a pattern file against a peak spec file.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    // 1) Load and validate the peak specs.
    let specs = peaks::load_specs(&config.peaks_path)?;

    // 2) Load and validate the pattern table.
    let loaded = ingest::load_pattern(
        &config.pattern_path,
        config.delimiter,
        config.direction,
        config.first_cake_angle,
    )?;

    // 3) Fit the batch against the requested cake.
    let mut session = FitSession::new(loaded.pattern, options_for(config.max_iterations));
    let report = session.fit_peaks(&specs, config.cake)?;

    Ok(RunOutput {
        session,
        report,
        row_errors: loaded.row_errors,
    })
}

/// Fit the built-in synthetic scene.
pub fn run_demo(config: &DemoConfig) -> Result<RunOutput, AppError> {
    // 1) Build the demo scene, resized per the CLI options.
    let (mut synth, specs) = synthetic::demo(config.seed)?;
    synth.n_samples = config.n_samples;
    synth.n_cakes = config.n_cakes;
    synth.noise = config.noise;
    let pattern = synthetic::generate(&synth)?;

    // 2) Fit the batch against the requested cake.
    let mut session = FitSession::new(pattern, options_for(config.max_iterations));
    let report = session.fit_peaks(&specs, config.cake)?;

    Ok(RunOutput {
        session,
        report,
        row_errors: Vec::new(),
    })
}

/// Load a pattern without fitting (the `inspect` command).
pub fn run_inspect(config: &InspectConfig) -> Result<LoadedPattern, AppError> {
    ingest::load_pattern(
        &config.pattern_path,
        config.delimiter,
        config.direction,
        config.first_cake_angle,
    )
}

fn options_for(max_iterations: usize) -> FitOptions {
    FitOptions {
        max_iterations,
        ..FitOptions::default()
    }
}
