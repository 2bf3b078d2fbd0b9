//! Sigmoid fitting for a single control group.
//!
//! Given:
//! - the plate's raw signals
//! - one group's control mask
//! - the reference concentration grid
//!
//! we collect `(log10 concentration, signal)` pairs, start Levenberg–Marquardt
//! from `(median(x), median(y), 1.0, 1.0)` and return the fitted parameters
//! together with diagnostics and the group's control range.
//!
//! The positive starting amplitude and steepness assume signal rises with
//! concentration (sandwich-style assays). Decreasing standard curves
//! (competitive assays) can settle on a flat plateau from this start, with a
//! very large negative steepness and a near-zero gradient.
//!
//! Precondition: at least 4 control points for the 4-parameter model to be
//! identifiable. Smaller groups are still fitted (the damped solver stays
//! well-defined) but the result is not meaningful; a warning is logged.

use log::{info, warn};
use nalgebra::{DMatrix, DVector};

use crate::domain::{
    ControlPoint, ControlRange, FitParams, FitStatus, Grid, GroupFit, GroupKey, GroupMasks, Plate,
};
use crate::math::{LmOptions, levenberg_marquardt, median};
use crate::models::{sigmoid, sigmoid_gradient};

/// Number of sigmoid parameters.
pub const PARAM_COUNT: usize = 4;

/// Fitting options.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Residual-evaluation budget for the solver.
    pub max_evaluations: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_evaluations: LmOptions::for_params(PARAM_COUNT).max_evaluations,
        }
    }
}

/// Raw solver output for one set of points.
#[derive(Debug, Clone)]
pub struct SigmoidFit {
    pub params: FitParams,
    pub status: FitStatus,
    pub sse: f64,
    pub rmse: f64,
    pub evaluations: usize,
}

/// Collect the usable control points of one group.
///
/// Wells with a missing measurement, or whose known concentration is missing,
/// non-finite, or non-positive (no logarithm), are dropped with a warning.
pub fn control_points(
    plate: &Plate,
    masks: &GroupMasks,
    concentrations: &Grid<Option<f64>>,
) -> Vec<ControlPoint> {
    let mut out = Vec::with_capacity(masks.control.count());
    for well in masks.control.positions() {
        let Some(signal) = plate.signals[well] else {
            warn!("{}: control well {well} has no measurement; excluded from fit", plate.name);
            continue;
        };
        let concentration = concentrations[well].unwrap_or(f64::NAN);
        if !(concentration.is_finite() && concentration > 0.0) {
            warn!(
                "{}: control well {well} has concentration {concentration}; excluded from fit (log10 undefined)",
                plate.name
            );
            continue;
        }
        out.push(ControlPoint {
            well,
            log_concentration: concentration.log10(),
            signal,
        });
    }
    out
}

/// Initial guess `(median(x), median(y), 1.0, 1.0)`.
pub fn initial_guess(points: &[ControlPoint]) -> Option<FitParams> {
    let xs: Vec<f64> = points.iter().map(|p| p.log_concentration).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.signal).collect();
    Some(FitParams {
        inflection: median(&xs)?,
        baseline: median(&ys)?,
        amplitude: 1.0,
        steepness: 1.0,
    })
}

/// Fit the sigmoid to `points` by nonlinear least squares.
pub fn fit_sigmoid(points: &[ControlPoint], opts: &FitOptions) -> SigmoidFit {
    let Some(guess) = initial_guess(points) else {
        return SigmoidFit {
            params: FitParams::NAN,
            status: FitStatus::Degenerate,
            sse: f64::NAN,
            rmse: f64::NAN,
            evaluations: 0,
        };
    };

    let m = points.len();
    let residuals = |p: &DVector<f64>| {
        let params = FitParams::from_slice(p.as_slice());
        DVector::from_iterator(
            m,
            points
                .iter()
                .map(|pt| pt.signal - sigmoid(&params, pt.log_concentration)),
        )
    };
    // d(residual)/dp = -d(model)/dp
    let jacobian = |p: &DVector<f64>| {
        let params = FitParams::from_slice(p.as_slice());
        let mut jac = DMatrix::<f64>::zeros(m, PARAM_COUNT);
        for (i, pt) in points.iter().enumerate() {
            let grad = sigmoid_gradient(&params, pt.log_concentration);
            for (j, g) in grad.iter().enumerate() {
                jac[(i, j)] = -g;
            }
        }
        jac
    };

    let lm_opts = LmOptions {
        max_evaluations: opts.max_evaluations,
        ..LmOptions::for_params(PARAM_COUNT)
    };
    let start = DVector::from_row_slice(&guess.to_array());
    let report = levenberg_marquardt(residuals, jacobian, &start, &lm_opts);

    SigmoidFit {
        params: FitParams::from_slice(report.params.as_slice()),
        status: report.status,
        sse: report.sse,
        rmse: (report.sse / m as f64).sqrt(),
        evaluations: report.evaluations,
    }
}

/// Fit one (plate, group) pair.
pub fn fit_group(
    key: GroupKey,
    plate: &Plate,
    masks: &GroupMasks,
    concentrations: &Grid<Option<f64>>,
    opts: &FitOptions,
) -> GroupFit {
    let points = control_points(plate, masks, concentrations);
    if points.len() < PARAM_COUNT {
        warn!(
            "{} {key}: only {} usable control point(s); the {PARAM_COUNT}-parameter fit is under-determined",
            plate.name,
            points.len()
        );
    }

    let fit = fit_sigmoid(&points, opts);
    if fit.status.is_converged() {
        info!(
            "{} {key}: fitted {} points, rmse={:.4} ({})",
            plate.name,
            points.len(),
            fit.rmse,
            fit.status.describe()
        );
    } else {
        warn!(
            "{} {key}: fit did not converge ({}), rmse={:.4}",
            plate.name,
            fit.status.describe(),
            fit.rmse
        );
    }

    let range = ControlRange::from_points(&points);
    GroupFit {
        key,
        params: fit.params,
        status: fit.status,
        sse: fit.sse,
        rmse: fit.rmse,
        evaluations: fit.evaluations,
        points,
        range,
    }
}
