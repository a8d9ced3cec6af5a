//! Export per-maximum results to CSV.
//!
//! One row per fitted maximum, flat enough to drop into a spreadsheet or a
//! plotting script. Optional quantities (standard errors, SNR) export as
//! empty cells rather than sentinel numbers.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::FitOutcome;
use crate::error::AppError;

/// Write per-maximum results to a CSV file.
pub fn write_results_csv(path: &Path, outcomes: &[FitOutcome]) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::input(format!("failed to create export CSV '{}': {e}", path.display()))
    })?;

    writeln!(
        file,
        "name,peak,cake,center,center_err,sigma,sigma_err,fraction,fraction_err,\
         amplitude,amplitude_err,height,fwhm,snr,background,background_err,\
         converged,iterations,rmse"
    )
    .map_err(|e| AppError::input(format!("failed to write export CSV header: {e}")))?;

    for outcome in outcomes {
        for maximum in &outcome.maxima {
            let errs = maximum.std_errors.as_ref();
            writeln!(
                file,
                "{},{},{},{:.6},{},{:.6},{},{:.6},{},{:.6},{},{:.6},{:.6},{},{:.6},{},{},{},{:.6}",
                maximum.name,
                outcome.label,
                outcome.cake,
                maximum.params.center,
                opt(errs.map(|e| e.center)),
                maximum.params.sigma,
                opt(errs.map(|e| e.sigma)),
                maximum.params.fraction,
                opt(errs.map(|e| e.fraction)),
                maximum.params.amplitude,
                opt(errs.map(|e| e.amplitude)),
                maximum.height,
                maximum.fwhm,
                opt(maximum.snr),
                outcome.background,
                opt(outcome.background_err),
                outcome.quality.converged,
                outcome.quality.iterations,
                outcome.quality.rmse,
            )
            .map_err(|e| AppError::input(format!("failed to write export CSV row: {e}")))?;
        }
    }

    Ok(())
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}
