//! Nonlinear refinement of one peak window.
//!
//! Levenberg–Marquardt with Marquardt diagonal scaling:
//!
//! - each iteration assembles the analytic Jacobian and solves the damped
//!   normal equations for a step
//! - rejected steps (SSE did not improve) retry with more damping before a
//!   fresh Jacobian is built; accepted steps relax the damping
//! - after every step the parameters are projected back into their valid
//!   domain (sigma floor, non-negative amplitude, fraction in [0, 1])
//! - exhausting the iteration budget or the damping ceiling is not an error:
//!   the best parameters so far are returned flagged as not converged
//!
//! Fatal conditions are limited to windows the fit cannot be posed on at
//! all: fewer samples than free parameters, or non-finite intensities.

use nalgebra::{DMatrix, DVector};

use crate::domain::FitQuality;
use crate::error::AppError;
use crate::math::{covariance, solve_damped};
use crate::models::CompositeModel;

/// Options controlling the LM refinement.
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    /// Outer iteration budget (one fresh Jacobian per iteration).
    pub max_iterations: usize,
    /// Initial damping factor.
    pub lambda_init: f64,
    /// Damping multiplier after a rejected step.
    pub lambda_up: f64,
    /// Damping multiplier after an accepted step.
    pub lambda_down: f64,
    /// Damping ceiling; beyond it the fit is declared stalled.
    pub lambda_max: f64,
    /// Converged when an accepted step moves no parameter more than this.
    pub step_tol: f64,
    /// Converged when an accepted step improves SSE by less than this
    /// relative amount.
    pub sse_tol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            lambda_init: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            lambda_max: 1e10,
            step_tol: 1e-8,
            sse_tol: 1e-10,
        }
    }
}

/// A refined window: final parameters plus diagnostics.
#[derive(Debug, Clone)]
pub struct WindowFit {
    /// Flat parameter vector in the composite layout.
    pub theta: Vec<f64>,
    /// Per-parameter standard errors, in the same layout; `None` when the
    /// window leaves no degrees of freedom or the normal matrix is singular.
    pub std_errors: Option<Vec<f64>>,
    pub quality: FitQuality,
}

/// Refine a composite model against one window of samples.
pub fn fit_window(
    model: &CompositeModel,
    angle: &[f64],
    intensity: &[f64],
    start: &[f64],
    options: &FitOptions,
) -> Result<WindowFit, AppError> {
    let n = angle.len();
    let p = model.n_params();
    if n < p {
        return Err(AppError::data(format!(
            "window has {n} samples but the model has {p} free parameters"
        )));
    }
    if !intensity.iter().all(|v| v.is_finite()) {
        return Err(AppError::data(
            "window contains non-finite intensity samples",
        ));
    }

    let mut theta = start.to_vec();
    model.clamp(&mut theta);
    let mut sse = sse_of(model, angle, intensity, &theta);
    if !sse.is_finite() {
        return Err(AppError::numeric(
            "initial model evaluation is not finite; check the starting parameters",
        ));
    }

    let mut lambda = options.lambda_init;
    let mut converged = false;
    let mut iterations = 0;

    'outer: while iterations < options.max_iterations {
        iterations += 1;
        let (jac, resid) = assemble(model, angle, intensity, &theta);
        let normal = jac.transpose() * &jac;
        let gradient = jac.transpose() * &resid;

        // Retry this Jacobian with increasing damping until a step helps.
        loop {
            if lambda > options.lambda_max {
                break 'outer;
            }
            let Some(delta) = solve_damped(&normal, &gradient, lambda) else {
                lambda *= options.lambda_up;
                continue;
            };

            let mut candidate: Vec<f64> = theta
                .iter()
                .zip(delta.iter())
                .map(|(t, d)| t + d)
                .collect();
            model.clamp(&mut candidate);
            let candidate_sse = sse_of(model, angle, intensity, &candidate);

            if candidate_sse.is_finite() && candidate_sse <= sse {
                let max_step = theta
                    .iter()
                    .zip(&candidate)
                    .map(|(a, b)| (a - b).abs())
                    .fold(0.0, f64::max);
                let improvement = (sse - candidate_sse) / sse.max(f64::MIN_POSITIVE);
                theta = candidate;
                sse = candidate_sse;
                lambda = (lambda * options.lambda_down).max(1e-12);
                if max_step < options.step_tol || improvement < options.sse_tol {
                    converged = true;
                    break 'outer;
                }
                break;
            }
            lambda *= options.lambda_up;
        }
    }

    let std_errors = standard_errors(model, angle, intensity, &theta, sse);
    let quality = FitQuality {
        converged,
        iterations,
        sse,
        rmse: (sse / n as f64).sqrt(),
        n_points: n,
        n_params: p,
    };
    Ok(WindowFit {
        theta,
        std_errors,
        quality,
    })
}

/// Jacobian and residual vector at `theta`.
fn assemble(
    model: &CompositeModel,
    angle: &[f64],
    intensity: &[f64],
    theta: &[f64],
) -> (DMatrix<f64>, DVector<f64>) {
    let n = angle.len();
    let p = model.n_params();
    let mut jac = DMatrix::zeros(n, p);
    let mut resid = DVector::zeros(n);
    let mut row = vec![0.0; p];
    for i in 0..n {
        model.fill_jacobian_row(angle[i], theta, &mut row);
        for j in 0..p {
            jac[(i, j)] = row[j];
        }
        resid[i] = intensity[i] - model.eval(angle[i], theta);
    }
    (jac, resid)
}

fn sse_of(model: &CompositeModel, angle: &[f64], intensity: &[f64], theta: &[f64]) -> f64 {
    angle
        .iter()
        .zip(intensity)
        .map(|(x, y)| {
            let r = y - model.eval(*x, theta);
            r * r
        })
        .sum()
}

/// Standard errors from `s² (JᵀJ)⁻¹` at the final parameters.
fn standard_errors(
    model: &CompositeModel,
    angle: &[f64],
    intensity: &[f64],
    theta: &[f64],
    sse: f64,
) -> Option<Vec<f64>> {
    let dof = angle.len().checked_sub(model.n_params())?;
    if dof == 0 {
        return None;
    }
    let (jac, _) = assemble(model, angle, intensity, theta);
    let normal = jac.transpose() * &jac;
    let cov = covariance(&normal, sse / dof as f64)?;
    Some((0..model.n_params()).map(|j| cov[(j, j)].sqrt()).collect())
}
