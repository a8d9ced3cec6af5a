//! Composite model for one peak window.
//!
//! A window with `N` declared maxima is fitted as
//!
//! `curve(x) = Σ_i pseudo_voigt(x; block_i) + background`
//!
//! over the flat parameter vector
//!
//! `[center_1, sigma_1, fraction_1, amplitude_1, ..., center_N, ..., background]`
//!
//! The fitter relies on three primitive operations:
//! - evaluate the curve at an angle (for residuals/exports)
//! - fill a Jacobian row with the analytic partials (for the LM step)
//! - project a parameter vector back into its valid domain after a step
//!
//! Blocks are addressed by ordinal index here; the session maps names to
//! indices at the API surface.

use crate::domain::{PeakSpec, PvParams};
use crate::models::shape;

/// Parameters per maximum block: center, sigma, fraction, amplitude.
pub const BLOCK: usize = 4;

/// Sigma floor applied during constraint projection, well below any resolvable
/// peak width on a diffraction angle axis.
const MIN_SIGMA: f64 = 1e-6;

/// The composite pseudo-Voigt model of one peak window.
#[derive(Debug, Clone, Copy)]
pub struct CompositeModel {
    n_maxima: usize,
}

impl CompositeModel {
    /// Build the composite for a validated spec: one parameter block per
    /// declared maximum plus the shared background.
    pub fn new(spec: &PeakSpec) -> Self {
        Self {
            n_maxima: spec.n_maxima(),
        }
    }

    pub fn n_maxima(&self) -> usize {
        self.n_maxima
    }

    /// Total free parameter count: `4 * N + 1`.
    pub fn n_params(&self) -> usize {
        BLOCK * self.n_maxima + 1
    }

    /// Pack per-maximum parameters and the background into a flat vector.
    pub fn pack(&self, maxima: &[PvParams], background: f64) -> Vec<f64> {
        debug_assert_eq!(maxima.len(), self.n_maxima);
        let mut theta = Vec::with_capacity(self.n_params());
        for p in maxima {
            theta.extend_from_slice(&[p.center, p.sigma, p.fraction, p.amplitude]);
        }
        theta.push(background);
        theta
    }

    /// The parameter block of maximum `i` (zero-based, left to right).
    pub fn max_params(&self, theta: &[f64], i: usize) -> PvParams {
        debug_assert_eq!(theta.len(), self.n_params());
        let at = BLOCK * i;
        PvParams {
            center: theta[at],
            sigma: theta[at + 1],
            fraction: theta[at + 2],
            amplitude: theta[at + 3],
        }
    }

    pub fn background(&self, theta: &[f64]) -> f64 {
        debug_assert_eq!(theta.len(), self.n_params());
        theta[BLOCK * self.n_maxima]
    }

    /// Evaluate the composite curve at one angle.
    pub fn eval(&self, x: f64, theta: &[f64]) -> f64 {
        let mut y = self.background(theta);
        for i in 0..self.n_maxima {
            y += shape::pseudo_voigt(x, &self.max_params(theta, i));
        }
        y
    }

    /// Evaluate the composite curve over a whole angle axis.
    pub fn eval_curve(&self, angle: &[f64], theta: &[f64]) -> Vec<f64> {
        angle.iter().map(|x| self.eval(*x, theta)).collect()
    }

    /// Fill one Jacobian row: `out[j] = ∂curve(x)/∂theta[j]`.
    ///
    /// # Panics
    /// Panics if `out` does not have length `n_params()`. Callers should size
    /// the row buffer once per fit.
    pub fn fill_jacobian_row(&self, x: f64, theta: &[f64], out: &mut [f64]) {
        assert_eq!(out.len(), self.n_params());
        for i in 0..self.n_maxima {
            let partials = shape::pseudo_voigt_partials(x, &self.max_params(theta, i));
            out[BLOCK * i..BLOCK * (i + 1)].copy_from_slice(&partials);
        }
        out[BLOCK * self.n_maxima] = 1.0;
    }

    /// Project a stepped parameter vector back into its valid domain:
    /// sigma is floored, amplitude is non-negative, fraction lies in [0, 1].
    /// Centers and the background stay free.
    pub fn clamp(&self, theta: &mut [f64]) {
        for i in 0..self.n_maxima {
            let at = BLOCK * i;
            theta[at + 1] = theta[at + 1].max(MIN_SIGMA);
            theta[at + 2] = theta[at + 2].clamp(0.0, 1.0);
            theta[at + 3] = theta[at + 3].max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PeakSpec;

    fn doublet_model() -> (CompositeModel, Vec<f64>) {
        let spec = PeakSpec::new(
            (3.0, 3.4),
            vec!["110".into(), "002".into()],
            Some(vec![(3.0, 3.2), (3.2, 3.4)]),
        )
        .unwrap();
        let model = CompositeModel::new(&spec);
        let theta = model.pack(
            &[
                PvParams {
                    center: 3.1,
                    sigma: 0.03,
                    fraction: 0.2,
                    amplitude: 1.5,
                },
                PvParams {
                    center: 3.3,
                    sigma: 0.05,
                    fraction: 0.8,
                    amplitude: 0.9,
                },
            ],
            4.0,
        );
        (model, theta)
    }

    #[test]
    fn pack_and_unpack_round_trip() {
        let (model, theta) = doublet_model();
        assert_eq!(theta.len(), model.n_params());
        assert_eq!(model.n_params(), 9);
        let first = model.max_params(&theta, 0);
        assert_eq!(first.center, 3.1);
        assert_eq!(first.amplitude, 1.5);
        let second = model.max_params(&theta, 1);
        assert_eq!(second.fraction, 0.8);
        assert_eq!(model.background(&theta), 4.0);
    }

    #[test]
    fn eval_is_the_sum_of_blocks_plus_background() {
        let (model, theta) = doublet_model();
        let x = 3.17;
        let expected = shape::pseudo_voigt(x, &model.max_params(&theta, 0))
            + shape::pseudo_voigt(x, &model.max_params(&theta, 1))
            + 4.0;
        assert!((model.eval(x, &theta) - expected).abs() < 1e-14);
    }

    #[test]
    fn jacobian_row_matches_finite_differences() {
        let (model, theta) = doublet_model();
        let x = 3.22;
        let mut row = vec![0.0; model.n_params()];
        model.fill_jacobian_row(x, &theta, &mut row);

        let eps = 1e-7;
        for j in 0..model.n_params() {
            let mut hi = theta.clone();
            let mut lo = theta.clone();
            hi[j] += eps;
            lo[j] -= eps;
            let numeric = (model.eval(x, &hi) - model.eval(x, &lo)) / (2.0 * eps);
            let scale = numeric.abs().max(1.0);
            assert!(
                (row[j] - numeric).abs() < 1e-5 * scale,
                "param {j}: analytic {} vs numeric {numeric}",
                row[j]
            );
        }
    }

    #[test]
    fn clamp_projects_out_of_domain_blocks() {
        let (model, mut theta) = doublet_model();
        theta[1] = -0.5; // sigma
        theta[2] = 1.7; // fraction
        theta[7] = -2.0; // amplitude of the second block
        model.clamp(&mut theta);
        assert!(theta[1] > 0.0);
        assert_eq!(theta[2], 1.0);
        assert_eq!(theta[7], 0.0);
        assert_eq!(model.background(&theta), 4.0);
    }
}
