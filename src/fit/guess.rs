//! Initial parameter guesses.
//!
//! The refinement starts from guesses derived purely from the declared bounds
//! and the raw samples inside them (no prior fit state, no randomness):
//!
//! - background: minimum intensity across the full peak window
//! - center: angle of the highest sample inside the maximum's own bounds
//! - sigma: half the maximum's bound width
//! - fraction: 0.5 (an even Gaussian/Lorentzian blend)
//! - amplitude: the area that makes the model height match the observed
//!   `max - background` at the guessed sigma/fraction
//!
//! The amplitude step matters: the shape is area-normalized, so seeding the
//! area with the raw height would start the curve far below the data.

use crate::domain::{DiffractionPattern, PeakSpec, PvParams, SpectrumSlice};
use crate::error::AppError;
use crate::models::shape;

/// Background guess for a peak window.
pub fn guess_background(window: &SpectrumSlice) -> f64 {
    window.min_intensity()
}

/// Guess the parameters of one maximum from the samples in its own bounds.
pub fn guess_maximum(in_bounds: &SpectrumSlice, bounds: (f64, f64), background: f64) -> PvParams {
    let (center, max_intensity) = in_bounds.max_sample();
    let sigma = 0.5 * (bounds.1 - bounds.0);
    let fraction = 0.5;
    let height = (max_intensity - background).max(0.0);
    PvParams {
        center,
        sigma,
        fraction,
        amplitude: shape::amplitude_for_height(height, sigma, fraction),
    }
}

/// Guesses for every maximum of a spec, plus the shared background guess.
///
/// A maximum's bounds that contain no samples are a data error for this spec;
/// the caller decides whether that aborts a batch or just this entry.
pub fn initial_guesses(
    pattern: &DiffractionPattern,
    cake: usize,
    spec: &PeakSpec,
) -> Result<(Vec<PvParams>, f64), AppError> {
    let window = pattern.slice(cake, spec.peak_bounds())?;
    let background = guess_background(&window);

    let mut guesses = Vec::with_capacity(spec.n_maxima());
    for (name, bounds) in spec.maxima_names().iter().zip(spec.maxima_bounds()) {
        let in_bounds = pattern.slice(cake, *bounds).map_err(|err| {
            AppError::new(err.exit_code(), format!("maximum '{name}': {err}"))
        })?;
        guesses.push(guess_maximum(&in_bounds, *bounds, background));
    }
    Ok((guesses, background))
}
