//! Four-parameter logistic (sigmoid) dose-response model.
//!
//! `y = amplitude / (1 + exp(-steepness * (x - inflection))) + baseline`
//!
//! with `x = log10(concentration)` and `y` the measured optical density.
//!
//! The fitter relies on two primitive operations:
//! - evaluate `y(x)` and its parameter gradient (for Levenberg–Marquardt)
//! - invert `x(y)` (for concentration prediction)

use crate::domain::FitParams;

/// Evaluate the sigmoid at `x`.
pub fn sigmoid(params: &FitParams, x: f64) -> f64 {
    params.amplitude * logistic(params, x) + params.baseline
}

/// Invert the sigmoid: the `x` at which the curve reaches `y`.
///
/// Outside the curve's open range `(baseline, baseline + amplitude)` the
/// result is non-finite (`±inf` when `y == baseline`, `NaN` when the log
/// argument is non-positive). Callers must check.
pub fn sigmoid_reverse(params: &FitParams, y: f64) -> f64 {
    params.inflection - ((params.amplitude / (y - params.baseline)) - 1.0).ln() / params.steepness
}

/// Partial derivatives of `sigmoid` with respect to
/// `(inflection, baseline, amplitude, steepness)`.
pub fn sigmoid_gradient(params: &FitParams, x: f64) -> [f64; 4] {
    let s = logistic(params, x);
    let ds = s * (1.0 - s);
    [
        -params.amplitude * params.steepness * ds,
        1.0,
        s,
        params.amplitude * (x - params.inflection) * ds,
    ]
}

fn logistic(params: &FitParams, x: f64) -> f64 {
    1.0 / (1.0 + (-params.steepness * (x - params.inflection)).exp())
}
