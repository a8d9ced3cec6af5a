//! Derived quantities of a fitted maximum.
//!
//! None of these feed back into the optimization; they are computed once from
//! the fitted parameters so downstream analysis never re-derives them
//! inconsistently.

use crate::domain::PvParams;
use crate::models::shape;

/// Height, width and signal-to-noise of one fitted maximum.
#[derive(Debug, Clone, Copy)]
pub struct Derived {
    /// Curve height above background at the fitted center.
    pub height: f64,
    /// Full width at half maximum.
    pub fwhm: f64,
    /// Height / background; `None` when the background is non-positive.
    pub snr: Option<f64>,
}

/// Signal-to-noise against the shared background level.
///
/// A non-positive background makes the ratio meaningless, so it is flagged
/// rather than computed; callers decide how to present the degenerate case.
pub fn snr(height: f64, background: f64) -> Option<f64> {
    if background > 0.0 {
        Some(height / background)
    } else {
        None
    }
}

/// All derived quantities for one maximum against the shared background.
pub fn derive(params: &PvParams, background: f64) -> Derived {
    let height = shape::height(params);
    Derived {
        height,
        fwhm: shape::fwhm(params.sigma),
        snr: snr(height, background),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::shape;

    fn params() -> PvParams {
        PvParams {
            center: 1.9,
            sigma: 0.05,
            fraction: 0.25,
            amplitude: 3.0,
        }
    }

    #[test]
    fn derived_quantities_match_the_shape_closed_forms() {
        let p = params();
        let d = derive(&p, 2.0);
        assert_eq!(d.height, shape::height(&p));
        assert_eq!(d.fwhm, 2.0 * p.sigma);
    }

    #[test]
    fn snr_is_the_exact_height_background_ratio() {
        let p = params();
        let d = derive(&p, 2.0);
        let expected = shape::height(&p) / 2.0;
        assert_eq!(d.snr, Some(expected));
    }

    #[test]
    fn non_positive_background_flags_snr_as_undefined() {
        let p = params();
        assert_eq!(derive(&p, 0.0).snr, None);
        assert_eq!(derive(&p, -1.5).snr, None);
        assert_eq!(snr(1.0, 0.0), None);
    }
}
