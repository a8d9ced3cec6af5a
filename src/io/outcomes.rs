//! Read/write fit outcome JSON files.
//!
//! Outcome JSON is the portable representation of a finished run: every
//! fitted window with its per-maximum parameters, standard errors, derived
//! quantities, diagnostics, and the composite curve sampled on the window.
//! The schema is defined by `domain::FitOutcome`.

use std::fs::File;
use std::path::Path;

use crate::domain::FitOutcome;
use crate::error::AppError;

/// Write outcomes to a JSON file.
pub fn write_outcomes_json(path: &Path, outcomes: &[FitOutcome]) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::input(format!(
            "failed to create outcome JSON '{}': {e}",
            path.display()
        ))
    })?;
    serde_json::to_writer_pretty(file, outcomes)
        .map_err(|e| AppError::input(format!("failed to write outcome JSON: {e}")))?;
    Ok(())
}

/// Read outcomes back from a JSON file.
pub fn read_outcomes_json(path: &Path) -> Result<Vec<FitOutcome>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::input(format!(
            "failed to open outcome JSON '{}': {e}",
            path.display()
        ))
    })?;
    let outcomes: Vec<FitOutcome> = serde_json::from_reader(file)
        .map_err(|e| AppError::input(format!("invalid outcome JSON: {e}")))?;
    Ok(outcomes)
}
