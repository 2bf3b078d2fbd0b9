//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `Σ r_i(p)^2` for a residual function `r` with Jacobian `J = ∂r/∂p`.
//!
//! Each iteration solves the damped linear problem
//!
//! ```text
//! minimize ||J δ + r||^2 + λ ||D δ||^2
//! ```
//!
//! where `D` holds the running maximum of the Jacobian column norms (Marquardt
//! scaling, as in MINPACK's `lmder`). Accepted steps shrink `λ`; rejected steps
//! grow it. Termination tests follow MINPACK:
//!
//! - `ftol`: actual and predicted relative reductions of the sum of squares are
//!   both at most `ftol`
//! - `xtol`: the scaled step is at most `xtol` times the scaled parameter norm
//! - evaluation budget (`max_evaluations` residual evaluations)

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::domain::FitStatus;
use crate::math::solve_least_squares;

/// Default tolerance (sqrt of machine epsilon), as in `scipy.optimize.leastsq`.
pub const DEFAULT_TOL: f64 = 1.49012e-8;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;

/// Solver settings.
#[derive(Debug, Clone)]
pub struct LmOptions {
    pub max_evaluations: usize,
    pub ftol: f64,
    pub xtol: f64,
}

impl LmOptions {
    /// MINPACK's default budget of `200 * (n + 1)` evaluations for `n` parameters.
    pub fn for_params(n: usize) -> Self {
        Self {
            max_evaluations: 200 * (n + 1),
            ftol: DEFAULT_TOL,
            xtol: DEFAULT_TOL,
        }
    }
}

/// Solver output.
#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: DVector<f64>,
    /// Final sum of squared residuals.
    pub sse: f64,
    pub evaluations: usize,
    pub status: FitStatus,
}

/// Run Levenberg–Marquardt from `start`.
///
/// Never fails: problems (non-finite start, empty residual vector) are reported
/// through `FitStatus::Degenerate` and the returned parameters are whatever the
/// solver last accepted.
pub fn levenberg_marquardt<R, J>(
    residuals: R,
    jacobian: J,
    start: &DVector<f64>,
    opts: &LmOptions,
) -> LmReport
where
    R: Fn(&DVector<f64>) -> DVector<f64>,
    J: Fn(&DVector<f64>) -> DMatrix<f64>,
{
    let n = start.len();
    let mut p = start.clone();
    let mut r = residuals(&p);
    let mut evaluations = 1usize;
    let mut sse = r.norm_squared();

    if r.is_empty() || !sse.is_finite() || p.iter().any(|v| !v.is_finite()) {
        return LmReport {
            params: p,
            sse,
            evaluations,
            status: FitStatus::Degenerate,
        };
    }

    let mut lambda = LAMBDA_INIT;
    let mut scale = DVector::<f64>::zeros(n);
    let mut status = FitStatus::MaxEvaluations;

    'outer: while evaluations < opts.max_evaluations {
        if sse == 0.0 {
            status = FitStatus::ExactFit;
            break;
        }

        let jac = jacobian(&p);
        if jac.iter().any(|v| !v.is_finite()) {
            status = FitStatus::Degenerate;
            break;
        }
        for j in 0..n {
            let norm = jac.column(j).norm();
            scale[j] = scale[j].max(norm);
            if scale[j] == 0.0 {
                scale[j] = 1.0;
            }
        }

        // Inner loop: grow λ until a step reduces the sum of squares.
        loop {
            let Some(delta) = damped_step(&jac, &r, &scale, lambda) else {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    status = FitStatus::StepTolerance;
                    break 'outer;
                }
                continue;
            };

            let trial = &p + &delta;
            let r_trial = residuals(&trial);
            evaluations += 1;
            let sse_trial = r_trial.norm_squared();

            let step_norm = delta.component_mul(&scale).norm();
            let param_norm = trial.component_mul(&scale).norm();
            let step_small = step_norm <= opts.xtol * param_norm;

            if sse_trial.is_finite() && sse_trial < sse {
                let predicted = (&r + &jac * &delta).norm_squared();
                let actual_reduction = (sse - sse_trial) / sse;
                let predicted_reduction = (sse - predicted) / sse;
                let residual_small =
                    actual_reduction.abs() <= opts.ftol && predicted_reduction.abs() <= opts.ftol;

                p = trial;
                r = r_trial;
                sse = sse_trial;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);

                match (residual_small, step_small) {
                    (true, true) => {
                        status = FitStatus::ResidualAndStepTolerance;
                        break 'outer;
                    }
                    (true, false) => {
                        status = FitStatus::ResidualTolerance;
                        break 'outer;
                    }
                    (false, true) => {
                        status = FitStatus::StepTolerance;
                        break 'outer;
                    }
                    (false, false) => break,
                }
            }

            // Rejected step.
            if step_small {
                status = FitStatus::StepTolerance;
                break 'outer;
            }
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                status = FitStatus::StepTolerance;
                break 'outer;
            }
            if evaluations >= opts.max_evaluations {
                break 'outer;
            }
        }
    }

    if status == FitStatus::MaxEvaluations && sse == 0.0 {
        status = FitStatus::ExactFit;
    }

    debug!(
        "levenberg-marquardt: status={:?} sse={sse:.6e} evaluations={evaluations} lambda={lambda:.1e}",
        status
    );

    LmReport {
        params: p,
        sse,
        evaluations,
        status,
    }
}

/// Solve `[J; sqrt(λ) D] δ = [-r; 0]` in the least-squares sense.
fn damped_step(
    jac: &DMatrix<f64>,
    r: &DVector<f64>,
    scale: &DVector<f64>,
    lambda: f64,
) -> Option<DVector<f64>> {
    let m = jac.nrows();
    let n = jac.ncols();
    let sqrt_lambda = lambda.sqrt();

    let mut a = DMatrix::<f64>::zeros(m + n, n);
    a.view_mut((0, 0), (m, n)).copy_from(jac);
    for j in 0..n {
        a[(m + j, j)] = sqrt_lambda * scale[j];
    }

    let mut b = DVector::<f64>::zeros(m + n);
    for i in 0..m {
        b[i] = -r[i];
    }

    solve_least_squares(&a, &b)
}
