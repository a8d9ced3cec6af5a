//! Linear solves behind the Levenberg–Marquardt step.
//!
//! Each LM iteration solves the damped normal equations
//!
//! ```text
//! (JᵀJ + λ diag(JᵀJ)) δ = Jᵀr
//! ```
//!
//! Implementation choices:
//! - We solve via SVD. The Jacobian columns of a composite peak model can be
//!   nearly collinear (two maxima drifting onto each other, or the
//!   fraction/amplitude pair at vanishing amplitude), and SVD degrades
//!   gracefully where a Cholesky factorization would fail outright.
//! - The parameter dimension is tiny (4 per maximum plus background), so SVD
//!   cost is irrelevant next to Jacobian assembly.
//! - Covariance comes from the pseudo-inverse of the undamped normal matrix,
//!   refused entirely when the conditioning makes it meaningless.

use nalgebra::{DMatrix, DVector};

/// Relative singular-value cutoff above which the normal matrix is treated as
/// effectively singular for covariance purposes.
const COND_LIMIT: f64 = 1e-12;

/// Solve the damped normal equations for one LM step.
///
/// `normal` is `JᵀJ`, `gradient` is `Jᵀr`; the Marquardt scaling multiplies
/// the diagonal by `1 + lambda` so damping follows each parameter's own
/// curvature scale. Returns `None` if the system is too ill-conditioned to
/// solve robustly.
pub fn solve_damped(
    normal: &DMatrix<f64>,
    gradient: &DVector<f64>,
    lambda: f64,
) -> Option<DVector<f64>> {
    let mut damped = normal.clone();
    for j in 0..damped.nrows() {
        damped[(j, j)] *= 1.0 + lambda;
    }

    let svd = damped.svd(true, true);

    // Try progressively looser tolerances if the strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(delta) = svd.solve(gradient, tol) {
            if delta.iter().all(|v| v.is_finite()) {
                return Some(delta);
            }
        }
    }

    None
}

/// Parameter covariance `s² (JᵀJ)⁻¹` from the undamped normal matrix.
///
/// Returns `None` when the matrix is numerically singular; standard errors
/// read off a near-singular inverse would be noise, not uncertainty.
pub fn covariance(normal: &DMatrix<f64>, s2: f64) -> Option<DMatrix<f64>> {
    let svd = normal.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    let min_sv = svd.singular_values.min();
    if !max_sv.is_finite() || min_sv <= max_sv * COND_LIMIT {
        return None;
    }

    let inverse = svd.pseudo_inverse(0.0).ok()?;
    let cov = inverse * s2;
    if cov.iter().all(|v| v.is_finite()) {
        Some(cov)
    } else {
        None
    }
}
