//! Keyed storage of fit outcomes.
//!
//! Consumers ask for results by crystallographic maximum name; a multiplet is
//! fitted once but must answer under every constituent name. The store keeps
//! outcomes in registration order and maps each name to the owning outcome's
//! index, so lookups by any alias land on the same record.
//!
//! Names are unique for the lifetime of the store: a spec trying to re-use a
//! registered name is rejected before any fitting work is spent on it.

use std::collections::HashMap;

use crate::domain::{FitOutcome, PeakSpec};
use crate::error::AppError;

#[derive(Debug, Clone, Default)]
pub struct FitResultStore {
    outcomes: Vec<FitOutcome>,
    by_name: HashMap<String, usize>,
}

impl FitResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcomes in registration order.
    pub fn outcomes(&self) -> &[FitOutcome] {
        &self.outcomes
    }

    /// Check that none of a spec's maxima names is registered yet.
    pub fn names_free(&self, spec: &PeakSpec) -> Result<(), AppError> {
        for name in spec.maxima_names() {
            if self.by_name.contains_key(name) {
                return Err(AppError::input(format!(
                    "maximum '{}' is already registered (peak '{}')",
                    name,
                    spec.label()
                )));
            }
        }
        Ok(())
    }

    /// Register one outcome under all of its maxima names.
    ///
    /// All names are checked before any is inserted, so a rejected outcome
    /// leaves the store untouched.
    pub fn register(&mut self, outcome: FitOutcome) -> Result<(), AppError> {
        for m in &outcome.maxima {
            if self.by_name.contains_key(&m.name) {
                return Err(AppError::input(format!(
                    "maximum '{}' is already registered (peak '{}')",
                    m.name, outcome.label
                )));
            }
        }
        let idx = self.outcomes.len();
        for m in &outcome.maxima {
            self.by_name.insert(m.name.clone(), idx);
        }
        self.outcomes.push(outcome);
        Ok(())
    }

    /// Look up the outcome owning a maximum name.
    pub fn get(&self, name: &str) -> Result<&FitOutcome, AppError> {
        match self.by_name.get(name) {
            Some(idx) => Ok(&self.outcomes[*idx]),
            None => Err(AppError::input(format!(
                "no fitted maximum named '{name}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitQuality, FittedCurve, MaximumFit, PvParams};

    fn outcome(label: &str, names: &[&str]) -> FitOutcome {
        let params = PvParams {
            center: 3.0,
            sigma: 0.05,
            fraction: 0.5,
            amplitude: 1.0,
        };
        FitOutcome {
            label: label.to_string(),
            cake: 1,
            peak_bounds: (2.9, 3.1),
            maxima: names
                .iter()
                .map(|n| MaximumFit {
                    name: n.to_string(),
                    params,
                    std_errors: None,
                    height: 1.0,
                    fwhm: 0.1,
                    snr: Some(0.5),
                })
                .collect(),
            background: 2.0,
            background_err: None,
            quality: FitQuality {
                converged: true,
                iterations: 3,
                sse: 0.0,
                rmse: 0.0,
                n_points: 40,
                n_params: 5,
            },
            curve: FittedCurve {
                angle: vec![],
                intensity: vec![],
            },
        }
    }

    #[test]
    fn every_alias_of_a_multiplet_answers_with_the_same_outcome() {
        let mut store = FitResultStore::new();
        store.register(outcome("2+3", &["2", "3"])).unwrap();

        let by_2 = store.get("2").unwrap();
        let by_3 = store.get("3").unwrap();
        assert!(std::ptr::eq(by_2, by_3));
        assert_eq!(by_2.label, "2+3");
    }

    #[test]
    fn duplicate_names_are_rejected_and_leave_the_store_untouched() {
        let mut store = FitResultStore::new();
        store.register(outcome("a", &["a"])).unwrap();

        let err = store.register(outcome("a+b", &["b", "a"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("'a'"), "{err}");
        // The partially-overlapping outcome must not have claimed 'b'.
        assert!(store.get("b").is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_names_fail_with_a_clear_error() {
        let store = FitResultStore::new();
        let err = store.get("missing").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("'missing'"));
    }

    #[test]
    fn names_free_flags_collisions_before_fitting() {
        let mut store = FitResultStore::new();
        store.register(outcome("a", &["a"])).unwrap();

        let clash = PeakSpec::new(
            (1.0, 2.0),
            vec!["b".into(), "a".into()],
            Some(vec![(1.0, 1.5), (1.5, 2.0)]),
        )
        .unwrap();
        assert!(store.names_free(&clash).is_err());

        let fresh = PeakSpec::singlet((1.0, 2.0), "c").unwrap();
        assert!(store.names_free(&fresh).is_ok());
    }
}
