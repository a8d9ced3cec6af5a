//! One pattern's fitting session.
//!
//! The session owns the loaded pattern, the refinement options, and the
//! result store, and runs the per-spec pipeline:
//!
//! slice the cake to the peak window → derive initial guesses → refine →
//! compute derived quantities → register under every maximum name.
//!
//! Batch semantics: the submitted specs are independent. Structural problems
//! (duplicate names against the store or within the batch) are rejected
//! before any fitting work; data-window and numeric problems abort only the
//! affected spec. Either way the failure is returned in the batch report with
//! the offending peak's label, and every other spec proceeds. The fits of one
//! batch run on a rayon parallel iterator and are merged into the store in
//! submission order.

use std::collections::HashSet;

use rayon::prelude::*;

use crate::domain::{
    DiffractionPattern, FitOutcome, FittedCurve, MaximumFit, PeakSpec, PvParams, SpectrumSlice,
};
use crate::error::AppError;
use crate::fit::fitter::{self, FitOptions, WindowFit};
use crate::fit::store::FitResultStore;
use crate::fit::{derived, guess};
use crate::models::{BLOCK, CompositeModel};

/// One spec that could not be fitted, with the error that stopped it.
#[derive(Debug, Clone)]
pub struct SpecFailure {
    pub label: String,
    pub error: AppError,
}

/// What one `fit_peaks` call did: which peaks were recorded, which failed.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub cake: usize,
    pub recorded: Vec<String>,
    pub failures: Vec<SpecFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fitting session over one loaded pattern.
#[derive(Debug, Clone)]
pub struct FitSession {
    pattern: DiffractionPattern,
    options: FitOptions,
    store: FitResultStore,
}

impl FitSession {
    pub fn new(pattern: DiffractionPattern, options: FitOptions) -> Self {
        Self {
            pattern,
            options,
            store: FitResultStore::new(),
        }
    }

    pub fn pattern(&self) -> &DiffractionPattern {
        &self.pattern
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    pub fn store(&self) -> &FitResultStore {
        &self.store
    }

    /// Look up a fitted outcome by any of its maxima names.
    pub fn get(&self, name: &str) -> Result<&FitOutcome, AppError> {
        self.store.get(name)
    }

    /// Take the current store and start an empty one.
    ///
    /// The usual way to step to another cake: the returned outcomes can seed
    /// the next `fit_peaks_seeded` call while the session starts fresh.
    pub fn reset_store(&mut self) -> FitResultStore {
        std::mem::take(&mut self.store)
    }

    /// Fit a batch of peak specs against one cake, seeding every maximum from
    /// the bound-driven estimator.
    pub fn fit_peaks(&mut self, specs: &[PeakSpec], cake: usize) -> Result<BatchReport, AppError> {
        self.fit_batch(specs, cake, None)
    }

    /// Fit a batch of peak specs, preferring initial parameters from a
    /// previous store (warm start) where the maxima names match; anything not
    /// found in `seeds` falls back to the estimator.
    pub fn fit_peaks_seeded(
        &mut self,
        specs: &[PeakSpec],
        cake: usize,
        seeds: &FitResultStore,
    ) -> Result<BatchReport, AppError> {
        self.fit_batch(specs, cake, Some(seeds))
    }

    /// A formatted summary of the pattern and everything fitted so far.
    pub fn describe(&self) -> String {
        crate::report::format_session(self)
    }

    fn fit_batch(
        &mut self,
        specs: &[PeakSpec],
        cake: usize,
        seeds: Option<&FitResultStore>,
    ) -> Result<BatchReport, AppError> {
        // A bad cake index invalidates the whole call, not individual specs.
        self.pattern.cake(cake)?;

        let mut failures = Vec::new();
        let mut eligible: Vec<&PeakSpec> = Vec::new();
        let mut claimed: HashSet<&str> = HashSet::new();
        for spec in specs {
            if let Err(error) = self.store.names_free(spec) {
                failures.push(SpecFailure {
                    label: spec.label(),
                    error,
                });
                continue;
            }
            if let Some(name) = spec.maxima_names().iter().find(|n| claimed.contains(n.as_str())) {
                failures.push(SpecFailure {
                    label: spec.label(),
                    error: AppError::input(format!(
                        "maximum '{name}' is declared by two specs in this batch"
                    )),
                });
                continue;
            }
            for name in spec.maxima_names() {
                claimed.insert(name);
            }
            eligible.push(spec);
        }

        let pattern = &self.pattern;
        let options = self.options;
        let results: Vec<Result<FitOutcome, AppError>> = eligible
            .par_iter()
            .map(|spec| fit_one(pattern, &options, spec, cake, seeds))
            .collect();

        let mut recorded = Vec::new();
        for (spec, result) in eligible.iter().zip(results) {
            match result.and_then(|outcome| {
                let label = outcome.label.clone();
                self.store.register(outcome).map(|_| label)
            }) {
                Ok(label) => recorded.push(label),
                Err(error) => failures.push(SpecFailure {
                    label: spec.label(),
                    error,
                }),
            }
        }

        Ok(BatchReport {
            cake,
            recorded,
            failures,
        })
    }
}

fn label_err(label: &str, err: AppError) -> AppError {
    AppError::new(err.exit_code(), format!("peak '{label}': {err}"))
}

/// The full pipeline for one spec against one cake.
fn fit_one(
    pattern: &DiffractionPattern,
    options: &FitOptions,
    spec: &PeakSpec,
    cake: usize,
    seeds: Option<&FitResultStore>,
) -> Result<FitOutcome, AppError> {
    let label = spec.label();
    let window = pattern
        .slice(cake, spec.peak_bounds())
        .map_err(|e| label_err(&label, e))?;
    let (mut guesses, mut background) =
        guess::initial_guesses(pattern, cake, spec).map_err(|e| label_err(&label, e))?;

    if let Some(seeds) = seeds {
        for (i, name) in spec.maxima_names().iter().enumerate() {
            if let Ok(prev) = seeds.get(name) {
                if let Some(m) = prev.maximum(name) {
                    guesses[i] = m.params;
                    background = prev.background;
                }
            }
        }
    }

    let model = CompositeModel::new(spec);
    let start = model.pack(&guesses, background);
    let fit = fitter::fit_window(&model, window.angle, window.intensity, &start, options)
        .map_err(|e| label_err(&label, e))?;
    Ok(build_outcome(spec, cake, &model, &window, &fit))
}

fn build_outcome(
    spec: &PeakSpec,
    cake: usize,
    model: &CompositeModel,
    window: &SpectrumSlice,
    fit: &WindowFit,
) -> FitOutcome {
    let background = model.background(&fit.theta);
    let maxima = spec
        .maxima_names()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let params = model.max_params(&fit.theta, i);
            let d = derived::derive(&params, background);
            MaximumFit {
                name: name.clone(),
                params,
                std_errors: fit.std_errors.as_ref().map(|e| PvParams {
                    center: e[BLOCK * i],
                    sigma: e[BLOCK * i + 1],
                    fraction: e[BLOCK * i + 2],
                    amplitude: e[BLOCK * i + 3],
                }),
                height: d.height,
                fwhm: d.fwhm,
                snr: d.snr,
            }
        })
        .collect();

    FitOutcome {
        label: spec.label(),
        cake,
        peak_bounds: spec.peak_bounds(),
        maxima,
        background,
        background_err: fit.std_errors.as_ref().map(|e| e[model.n_params() - 1]),
        quality: fit.quality.clone(),
        curve: FittedCurve {
            angle: window.angle.to_vec(),
            intensity: model.eval_curve(window.angle, &fit.theta),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{SyntheticPattern, generate};

    fn doublet_truth() -> Vec<PvParams> {
        vec![
            PvParams {
                center: 3.08,
                sigma: 0.030,
                fraction: 0.4,
                amplitude: 4.0,
            },
            PvParams {
                center: 3.22,
                sigma: 0.035,
                fraction: 0.6,
                amplitude: 2.5,
            },
        ]
    }

    fn doublet_pattern(noise: f64) -> DiffractionPattern {
        generate(&SyntheticPattern {
            angle_start: 2.8,
            angle_end: 3.5,
            n_samples: 351,
            n_cakes: 3,
            background: 2.0,
            noise,
            seed: 11,
            maxima: doublet_truth(),
        })
        .unwrap()
    }

    fn doublet_spec() -> PeakSpec {
        PeakSpec::new(
            (3.0, 3.35),
            vec!["110".into(), "002".into()],
            Some(vec![(3.0, 3.15), (3.15, 3.35)]),
        )
        .unwrap()
    }

    #[test]
    fn two_maxima_synthetic_spectrum_is_recovered() {
        let pattern = doublet_pattern(0.1);
        let step = pattern.angle_step();
        let mut session = FitSession::new(pattern, FitOptions::default());

        let report = session.fit_peaks(&[doublet_spec()], 1).unwrap();
        assert!(report.is_clean(), "failures: {:?}", report.failures);
        assert_eq!(report.recorded, vec!["110+002".to_string()]);

        let truth = doublet_truth();
        let outcome = session.get("110").unwrap();
        assert!(outcome.quality.converged);
        for (fitted, expected) in outcome.maxima.iter().zip(&truth) {
            assert!(
                (fitted.params.center - expected.center).abs() < step,
                "{}: center off by {}",
                fitted.name,
                (fitted.params.center - expected.center).abs()
            );
            let rel = (fitted.params.amplitude - expected.amplitude).abs() / expected.amplitude;
            assert!(rel < 0.1, "{}: amplitude off by {rel}", fitted.name);
            assert!(fitted.snr.is_some());
        }
        assert!((outcome.background - 2.0).abs() < 0.1);
        assert_eq!(outcome.curve.angle.len(), outcome.curve.intensity.len());
    }

    #[test]
    fn multiplet_lookup_answers_under_every_name() {
        let pattern = doublet_pattern(0.05);
        let mut session = FitSession::new(pattern, FitOptions::default());
        let spec = PeakSpec::new(
            (3.0, 3.35),
            vec!["2".into(), "3".into()],
            Some(vec![(3.0, 3.15), (3.15, 3.35)]),
        )
        .unwrap();
        session.fit_peaks(&[spec], 1).unwrap();

        let by_2 = session.get("2").unwrap();
        let by_3 = session.get("3").unwrap();
        assert!(std::ptr::eq(by_2, by_3));
        assert_eq!(by_2.label, "2+3");
    }

    #[test]
    fn duplicate_name_in_a_later_batch_fails_alone() {
        let pattern = doublet_pattern(0.05);
        let mut session = FitSession::new(pattern, FitOptions::default());
        let first = PeakSpec::singlet((3.0, 3.15), "110").unwrap();
        session.fit_peaks(&[first.clone()], 1).unwrap();

        let fresh = PeakSpec::singlet((3.15, 3.35), "002").unwrap();
        let report = session.fit_peaks(&[first, fresh], 1).unwrap();
        assert_eq!(report.recorded, vec!["002".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].label, "110");
        assert_eq!(report.failures[0].error.exit_code(), 2);
        assert!(session.get("002").is_ok());
    }

    #[test]
    fn within_batch_name_collision_is_caught_before_fitting() {
        let pattern = doublet_pattern(0.05);
        let mut session = FitSession::new(pattern, FitOptions::default());
        let a = PeakSpec::singlet((3.0, 3.15), "X").unwrap();
        let b = PeakSpec::new(
            (3.0, 3.35),
            vec!["X".into(), "Y".into()],
            Some(vec![(3.0, 3.15), (3.15, 3.35)]),
        )
        .unwrap();

        let report = session.fit_peaks(&[a, b], 1).unwrap();
        assert_eq!(report.recorded, vec!["X".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].error.to_string().contains("'X'"));
        // The colliding spec must not have claimed its other name either.
        assert!(session.get("Y").is_err());
    }

    #[test]
    fn empty_window_fails_alone_and_siblings_proceed() {
        let pattern = doublet_pattern(0.05);
        let mut session = FitSession::new(pattern, FitOptions::default());
        let good = doublet_spec();
        let hollow = PeakSpec::singlet((9.0, 9.5), "ghost").unwrap();

        let report = session.fit_peaks(&[hollow, good], 1).unwrap();
        assert_eq!(report.recorded, vec!["110+002".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error.exit_code(), 3);
        assert!(report.failures[0].error.to_string().contains("ghost"));
    }

    #[test]
    fn bad_cake_index_is_a_session_error() {
        let pattern = doublet_pattern(0.05);
        let mut session = FitSession::new(pattern, FitOptions::default());
        let err = session.fit_peaks(&[doublet_spec()], 99).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn seeded_refit_carries_parameters_to_the_next_cake() {
        let pattern = doublet_pattern(0.1);
        let mut session = FitSession::new(pattern, FitOptions::default());
        session.fit_peaks(&[doublet_spec()], 1).unwrap();
        let first_center = session.get("110").unwrap().maxima[0].params.center;

        let seeds = session.reset_store();
        assert!(session.store().is_empty());
        let report = session
            .fit_peaks_seeded(&[doublet_spec()], 2, &seeds)
            .unwrap();
        assert!(report.is_clean(), "failures: {:?}", report.failures);

        let outcome = session.get("110").unwrap();
        assert_eq!(outcome.cake, 2);
        assert!(outcome.quality.converged);
        // Cake 2 holds the same maxima (amplitudes differ per cake).
        assert!((outcome.maxima[0].params.center - first_center).abs() < 0.01);
    }

    #[test]
    fn unconverged_outcome_is_recorded_with_its_flag() {
        let pattern = doublet_pattern(0.1);
        let starved = FitOptions {
            max_iterations: 1,
            ..FitOptions::default()
        };
        let mut session = FitSession::new(pattern, starved);
        let report = session.fit_peaks(&[doublet_spec()], 1).unwrap();
        assert!(report.is_clean(), "failures: {:?}", report.failures);

        let outcome = session.get("110").unwrap();
        assert!(!outcome.quality.converged);
        assert_eq!(outcome.quality.iterations, 1);
    }
}
