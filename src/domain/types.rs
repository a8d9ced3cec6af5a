//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for comparisons across cakes or time steps

use std::collections::HashSet;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Direction in which cake columns were unrolled from the 2D pattern.
///
/// Pure orientation metadata: it never enters the fitting math, but it is
/// carried alongside the pattern so downstream consumers can map a cake index
/// back to an azimuthal sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CakeDirection {
    Clockwise,
    Anticlockwise,
}

impl CakeDirection {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            CakeDirection::Clockwise => "clockwise",
            CakeDirection::Anticlockwise => "anticlockwise",
        }
    }
}

/// Column delimiter of the pattern table.
///
/// `Whitespace` matches runs of spaces/tabs (the common detector-export
/// format); the single-byte variants cover exports from spreadsheet tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Whitespace,
    Comma,
    Tab,
    Semicolon,
}

impl Delimiter {
    /// The delimiter byte, or `None` for whitespace splitting.
    pub fn byte(self) -> Option<u8> {
        match self {
            Delimiter::Whitespace => None,
            Delimiter::Comma => Some(b','),
            Delimiter::Tab => Some(b'\t'),
            Delimiter::Semicolon => Some(b';'),
        }
    }
}

/// Parameters of one pseudo-Voigt maximum.
///
/// `amplitude` is the integrated area, not the visual height; the height
/// follows from (amplitude, sigma, fraction) via a closed form. `fraction`
/// blends the components: 0 is pure Gaussian, 1 is pure Lorentzian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PvParams {
    pub center: f64,
    pub sigma: f64,
    pub fraction: f64,
    pub amplitude: f64,
}

/// A named analysis region: one peak window holding one or more maxima.
///
/// Validated at construction; once built, the bounds lists are complete
/// (the single-maximum default has been applied) and well ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakSpec {
    peak_bounds: (f64, f64),
    maxima_names: Vec<String>,
    maxima_bounds: Vec<(f64, f64)>,
}

impl PeakSpec {
    /// Build and validate a peak spec.
    ///
    /// `maxima_bounds = None` is accepted only for a single maximum, in which
    /// case the maximum's bounds default to the peak bounds.
    pub fn new(
        peak_bounds: (f64, f64),
        maxima_names: Vec<String>,
        maxima_bounds: Option<Vec<(f64, f64)>>,
    ) -> Result<Self, AppError> {
        let names: Vec<String> = maxima_names
            .into_iter()
            .map(|n| n.trim().to_string())
            .collect();
        if names.is_empty() {
            return Err(AppError::input("peak spec declares no maxima names"));
        }
        if names.iter().any(|n| n.is_empty()) {
            return Err(AppError::input("peak spec contains an empty maximum name"));
        }
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(AppError::input(format!(
                    "maximum name '{name}' appears twice in one peak spec"
                )));
            }
        }
        let label = names.join("+");

        ensure_ordered_pair("peak bounds", &label, peak_bounds)?;

        let bounds = match maxima_bounds {
            None if names.len() == 1 => vec![peak_bounds],
            None => {
                return Err(AppError::input(format!(
                    "peak '{label}': maxima bounds are required when {} maxima are declared",
                    names.len()
                )));
            }
            Some(bounds) => bounds,
        };
        if bounds.len() != names.len() {
            return Err(AppError::input(format!(
                "peak '{label}': {} maxima names but {} maxima bounds",
                names.len(),
                bounds.len()
            )));
        }
        for pair in &bounds {
            ensure_ordered_pair("maximum bounds", &label, *pair)?;
            if pair.0 < peak_bounds.0 || pair.1 > peak_bounds.1 {
                return Err(AppError::input(format!(
                    "peak '{label}': maximum bounds [{}, {}] lie outside peak bounds [{}, {}]",
                    pair.0, pair.1, peak_bounds.0, peak_bounds.1
                )));
            }
        }
        for pair in bounds.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(AppError::input(format!(
                    "peak '{label}': maxima bounds must be listed left to right"
                )));
            }
            if pair[1].0 < pair[0].1 {
                return Err(AppError::input(format!(
                    "peak '{label}': maxima bounds [{}, {}] and [{}, {}] overlap",
                    pair[0].0, pair[0].1, pair[1].0, pair[1].1
                )));
            }
        }

        Ok(Self {
            peak_bounds,
            maxima_names: names,
            maxima_bounds: bounds,
        })
    }

    /// Convenience constructor for a single maximum spanning the whole window.
    pub fn singlet(peak_bounds: (f64, f64), name: impl Into<String>) -> Result<Self, AppError> {
        Self::new(peak_bounds, vec![name.into()], None)
    }

    pub fn peak_bounds(&self) -> (f64, f64) {
        self.peak_bounds
    }

    pub fn maxima_names(&self) -> &[String] {
        &self.maxima_names
    }

    pub fn maxima_bounds(&self) -> &[(f64, f64)] {
        &self.maxima_bounds
    }

    pub fn n_maxima(&self) -> usize {
        self.maxima_names.len()
    }

    /// Display label: the maxima names joined with `+`.
    pub fn label(&self) -> String {
        self.maxima_names.join("+")
    }
}

fn ensure_ordered_pair(what: &str, label: &str, pair: (f64, f64)) -> Result<(), AppError> {
    if !pair.0.is_finite() || !pair.1.is_finite() {
        return Err(AppError::input(format!(
            "peak '{label}': {what} must be finite (got [{}, {}])",
            pair.0, pair.1
        )));
    }
    if pair.0 >= pair.1 {
        return Err(AppError::input(format!(
            "peak '{label}': {what} must satisfy lower < upper (got [{}, {}])",
            pair.0, pair.1
        )));
    }
    Ok(())
}

/// One caked diffraction pattern: a shared angle axis plus one intensity
/// column per azimuthal cake.
///
/// Immutable after construction and safe to share read-only across fit
/// workers. The angle axis is strictly increasing, which makes bound slicing
/// a pair of binary searches.
#[derive(Debug, Clone)]
pub struct DiffractionPattern {
    angle: Vec<f64>,
    cakes: Vec<Vec<f64>>,
    direction: CakeDirection,
    first_cake_angle: f64,
}

impl DiffractionPattern {
    pub fn new(
        angle: Vec<f64>,
        cakes: Vec<Vec<f64>>,
        direction: CakeDirection,
        first_cake_angle: f64,
    ) -> Result<Self, AppError> {
        if angle.len() < 2 {
            return Err(AppError::input(format!(
                "pattern needs at least 2 angle samples (got {})",
                angle.len()
            )));
        }
        if cakes.is_empty() {
            return Err(AppError::input("pattern has an angle axis but no cakes"));
        }
        for (i, value) in angle.iter().enumerate() {
            if !value.is_finite() {
                return Err(AppError::input(format!(
                    "angle axis sample {i} is not finite"
                )));
            }
        }
        for pair in angle.windows(2) {
            if pair[1] <= pair[0] {
                return Err(AppError::input(format!(
                    "angle axis must be strictly increasing ({} then {})",
                    pair[0], pair[1]
                )));
            }
        }
        for (i, cake) in cakes.iter().enumerate() {
            if cake.len() != angle.len() {
                return Err(AppError::input(format!(
                    "cake {} has {} samples but the angle axis has {}",
                    i + 1,
                    cake.len(),
                    angle.len()
                )));
            }
        }
        Ok(Self {
            angle,
            cakes,
            direction,
            first_cake_angle,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.angle.len()
    }

    pub fn n_cakes(&self) -> usize {
        self.cakes.len()
    }

    pub fn angle(&self) -> &[f64] {
        &self.angle
    }

    pub fn angle_range(&self) -> (f64, f64) {
        (self.angle[0], self.angle[self.angle.len() - 1])
    }

    /// Mean spacing of the angle axis (useful as a recovery tolerance).
    pub fn angle_step(&self) -> f64 {
        let (lo, hi) = self.angle_range();
        (hi - lo) / (self.angle.len() - 1) as f64
    }

    pub fn direction(&self) -> CakeDirection {
        self.direction
    }

    pub fn first_cake_angle(&self) -> f64 {
        self.first_cake_angle
    }

    /// One-based cake lookup, matching the column numbering of the input table.
    pub fn cake(&self, cake: usize) -> Result<&[f64], AppError> {
        if cake == 0 || cake > self.cakes.len() {
            return Err(AppError::input(format!(
                "cake {} is out of range (pattern has cakes 1..={})",
                cake,
                self.cakes.len()
            )));
        }
        Ok(&self.cakes[cake - 1])
    }

    /// Borrow the samples of one cake restricted to an angle window.
    ///
    /// An empty window (no samples between the bounds) is a data error: the
    /// caller declared bounds the pattern cannot support.
    pub fn slice(&self, cake: usize, bounds: (f64, f64)) -> Result<SpectrumSlice<'_>, AppError> {
        let intensity = self.cake(cake)?;
        let start = self.angle.partition_point(|a| *a < bounds.0);
        let end = self.angle.partition_point(|a| *a <= bounds.1);
        if start >= end {
            return Err(AppError::data(format!(
                "no samples inside [{}, {}] (pattern covers [{}, {}])",
                bounds.0,
                bounds.1,
                self.angle[0],
                self.angle[self.angle.len() - 1]
            )));
        }
        Ok(SpectrumSlice {
            angle: &self.angle[start..end],
            intensity: &intensity[start..end],
        })
    }
}

/// A borrowed window of one cake: angle samples plus intensities.
///
/// Never empty; produced only by [`DiffractionPattern::slice`].
#[derive(Debug, Clone, Copy)]
pub struct SpectrumSlice<'a> {
    pub angle: &'a [f64],
    pub intensity: &'a [f64],
}

impl SpectrumSlice<'_> {
    pub fn len(&self) -> usize {
        self.angle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angle.is_empty()
    }

    pub fn min_intensity(&self) -> f64 {
        self.intensity.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// The (angle, intensity) pair at the highest intensity sample.
    pub fn max_sample(&self) -> (f64, f64) {
        let mut best = 0;
        for i in 1..self.intensity.len() {
            if self.intensity[i] > self.intensity[best] {
                best = i;
            }
        }
        (self.angle[best], self.intensity[best])
    }

    pub fn all_finite(&self) -> bool {
        self.intensity.iter().all(|v| v.is_finite())
    }
}

/// Fit quality diagnostics for one peak window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub converged: bool,
    pub iterations: usize,
    pub sse: f64,
    pub rmse: f64,
    pub n_points: usize,
    pub n_params: usize,
}

/// Fitted parameters and derived quantities for one maximum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaximumFit {
    pub name: String,
    pub params: PvParams,
    /// Standard errors from the covariance estimate; `None` when the window
    /// leaves no degrees of freedom or the normal matrix is singular.
    pub std_errors: Option<PvParams>,
    pub height: f64,
    pub fwhm: f64,
    /// Height / background; `None` flags a non-positive fitted background.
    pub snr: Option<f64>,
}

/// The composite curve evaluated on the window's angle samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedCurve {
    pub angle: Vec<f64>,
    pub intensity: Vec<f64>,
}

/// Everything recorded for one fitted peak window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitOutcome {
    /// Display label: the maxima names joined with `+`.
    pub label: String,
    /// One-based cake index the window was sliced from.
    pub cake: usize,
    pub peak_bounds: (f64, f64),
    /// Per-maximum results, ordered left to right as declared.
    pub maxima: Vec<MaximumFit>,
    /// Shared background level.
    pub background: f64,
    pub background_err: Option<f64>,
    pub quality: FitQuality,
    pub curve: FittedCurve,
}

impl FitOutcome {
    /// The fitted result for one of this outcome's maxima, by name.
    pub fn maximum(&self, name: &str) -> Option<&MaximumFit> {
        self.maxima.iter().find(|m| m.name == name)
    }
}

/// A full `fit` run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub pattern_path: PathBuf,
    pub peaks_path: PathBuf,
    /// One-based cake to fit.
    pub cake: usize,
    pub delimiter: Delimiter,
    pub direction: CakeDirection,
    /// Azimuthal angle (degrees) of the first cake column.
    pub first_cake_angle: f64,
    pub max_iterations: usize,
    pub export_results: Option<PathBuf>,
    pub export_outcomes: Option<PathBuf>,
}

/// Configuration of the synthetic `demo` run.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub seed: u64,
    pub n_samples: usize,
    pub n_cakes: usize,
    /// One-based cake to fit.
    pub cake: usize,
    /// Standard deviation of the additive Gaussian noise.
    pub noise: f64,
    pub max_iterations: usize,
    pub export_results: Option<PathBuf>,
    pub export_outcomes: Option<PathBuf>,
}

/// Configuration of the `inspect` run (pattern summary without fitting).
#[derive(Debug, Clone)]
pub struct InspectConfig {
    pub pattern_path: PathBuf,
    pub delimiter: Delimiter,
    pub direction: CakeDirection,
    pub first_cake_angle: f64,
}
