//! Pseudo-Voigt shape primitives.
//!
//! The pseudo-Voigt used here is the area-normalized blend
//!
//! `pv(x) = A * [ (1-f) * G(x; sigma_g) + f * L(x; sigma) ]`
//!
//! where `A` is the integrated area, `f ∈ [0, 1]` the Lorentzian fraction,
//! `L` the area-normalized Lorentzian with half-width `sigma`, and `G` the
//! area-normalized Gaussian with `sigma_g = sigma / sqrt(2 ln 2)`. Rescaling
//! the Gaussian width this way gives both components the same full width at
//! half maximum, `2 sigma`, so the blend's FWHM is `2 sigma` exactly for
//! every fraction and the height above background has the closed form
//!
//! `height = (A / sigma) * [ (1-f) * sqrt(ln 2 / π) + f / π ]`
//!
//! The fitter needs two primitive operations per maximum:
//! - evaluate the shape at an angle (for residuals/curves)
//! - evaluate the four partial derivatives (for the Jacobian)

use std::f64::consts::{FRAC_1_PI, LN_2, PI};

use crate::domain::PvParams;

#[inline]
fn sigma_g(sigma: f64) -> f64 {
    sigma / (2.0 * LN_2).sqrt()
}

/// Height coefficient of the area-normalized Gaussian term: `sqrt(ln 2 / π)`.
#[inline]
fn gauss_height_coeff() -> f64 {
    (LN_2 / PI).sqrt()
}

/// Area-normalized Gaussian component at offset `d` from the center.
#[inline]
fn gaussian(d: f64, sigma: f64) -> f64 {
    let sg = sigma_g(sigma);
    (-(d * d) / (2.0 * sg * sg)).exp() / (sg * (2.0 * PI).sqrt())
}

/// Area-normalized Lorentzian component at offset `d` from the center.
#[inline]
fn lorentzian(d: f64, sigma: f64) -> f64 {
    sigma / (PI * (d * d + sigma * sigma))
}

/// Evaluate one pseudo-Voigt maximum at `x` (no background term).
pub fn pseudo_voigt(x: f64, p: &PvParams) -> f64 {
    let d = x - p.center;
    p.amplitude * ((1.0 - p.fraction) * gaussian(d, p.sigma) + p.fraction * lorentzian(d, p.sigma))
}

/// Partial derivatives of [`pseudo_voigt`] at `x`, ordered as the parameter
/// block `[center, sigma, fraction, amplitude]`.
pub fn pseudo_voigt_partials(x: f64, p: &PvParams) -> [f64; 4] {
    let d = x - p.center;
    let g = gaussian(d, p.sigma);
    let l = lorentzian(d, p.sigma);
    let sg2 = {
        let sg = sigma_g(p.sigma);
        sg * sg
    };
    let denom = d * d + p.sigma * p.sigma;
    let w = 1.0 - p.fraction;

    let dg_dcenter = g * d / sg2;
    let dl_dcenter = 2.0 * d * p.sigma / (PI * denom * denom);
    let dg_dsigma = g * (d * d / (sg2 * p.sigma) - 1.0 / p.sigma);
    let dl_dsigma = (d * d - p.sigma * p.sigma) / (PI * denom * denom);

    [
        p.amplitude * (w * dg_dcenter + p.fraction * dl_dcenter),
        p.amplitude * (w * dg_dsigma + p.fraction * dl_dsigma),
        p.amplitude * (l - g),
        w * g + p.fraction * l,
    ]
}

/// Height of the maximum above background: the shape evaluated at its center.
pub fn height(p: &PvParams) -> f64 {
    (p.amplitude / p.sigma) * ((1.0 - p.fraction) * gauss_height_coeff() + p.fraction * FRAC_1_PI)
}

/// Full width at half maximum. Both components share `FWHM = 2 sigma`, so the
/// width is independent of the fraction.
pub fn fwhm(sigma: f64) -> f64 {
    2.0 * sigma
}

/// The area that gives a maximum of the requested height at the given
/// sigma/fraction. Inverse of [`height`]; used to seed amplitude guesses so
/// the initial curve visually matches the data.
pub fn amplitude_for_height(height: f64, sigma: f64, fraction: f64) -> f64 {
    height * sigma / ((1.0 - fraction) * gauss_height_coeff() + fraction * FRAC_1_PI)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(fraction: f64) -> PvParams {
        PvParams {
            center: 3.1,
            sigma: 0.045,
            fraction,
            amplitude: 2.4,
        }
    }

    #[test]
    fn height_matches_direct_evaluation_at_the_center() {
        for fraction in [0.0, 0.35, 1.0] {
            let p = probe(fraction);
            let at_center = pseudo_voigt(p.center, &p);
            assert!(
                (height(&p) - at_center).abs() < 1e-12 * at_center,
                "fraction {fraction}: height {} vs direct {at_center}",
                height(&p)
            );
        }
    }

    #[test]
    fn gaussian_and_lorentzian_limits_have_the_textbook_heights() {
        let g = probe(0.0);
        let expected_g = g.amplitude / (sigma_g(g.sigma) * (2.0 * PI).sqrt());
        assert!((height(&g) - expected_g).abs() < 1e-12 * expected_g);

        let l = probe(1.0);
        let expected_l = l.amplitude / (PI * l.sigma);
        assert!((height(&l) - expected_l).abs() < 1e-12 * expected_l);
    }

    #[test]
    fn shape_reaches_half_maximum_at_one_sigma_for_every_fraction() {
        for fraction in [0.0, 0.5, 1.0] {
            let p = probe(fraction);
            let half = 0.5 * pseudo_voigt(p.center, &p);
            let at_hwhm = pseudo_voigt(p.center + p.sigma, &p);
            assert!(
                (at_hwhm - half).abs() < 1e-12 * half,
                "fraction {fraction}: {at_hwhm} vs half {half}"
            );
            assert!((fwhm(p.sigma) - 2.0 * p.sigma).abs() < 1e-15);
        }
    }

    #[test]
    fn amplitude_for_height_inverts_height() {
        let p = probe(0.42);
        let back = amplitude_for_height(height(&p), p.sigma, p.fraction);
        assert!((back - p.amplitude).abs() < 1e-12 * p.amplitude);
    }

    fn numeric_partial(x: f64, p: &PvParams, idx: usize) -> f64 {
        let eps = 1e-7;
        let mut lo = *p;
        let mut hi = *p;
        match idx {
            0 => {
                lo.center -= eps;
                hi.center += eps;
            }
            1 => {
                lo.sigma -= eps;
                hi.sigma += eps;
            }
            2 => {
                lo.fraction -= eps;
                hi.fraction += eps;
            }
            _ => {
                lo.amplitude -= eps;
                hi.amplitude += eps;
            }
        }
        (pseudo_voigt(x, &hi) - pseudo_voigt(x, &lo)) / (2.0 * eps)
    }

    #[test]
    fn analytic_partials_match_finite_differences() {
        let p = probe(0.3);
        for x in [p.center - 0.1, p.center - 0.01, p.center, p.center + 0.07] {
            let analytic = pseudo_voigt_partials(x, &p);
            for idx in 0..4 {
                let numeric = numeric_partial(x, &p, idx);
                let scale = numeric.abs().max(1.0);
                assert!(
                    (analytic[idx] - numeric).abs() < 1e-5 * scale,
                    "partial {idx} at x={x}: analytic {} vs numeric {numeric}",
                    analytic[idx]
                );
            }
        }
    }
}
