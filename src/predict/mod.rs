//! Concentration prediction: invert a fitted sigmoid for experimental wells.
//!
//! Nothing here fails. Signals outside the curve's range produce non-finite
//! log-concentrations which propagate into the result grid; the assembler
//! flags them.

use crate::domain::{ControlRange, FitParams};
use crate::models::sigmoid_reverse;

/// Slack (in log10 units) when comparing a prediction with the control range,
/// so a well sitting exactly on the top or bottom standard is not flagged
/// because of round-off in the inversion.
pub const RANGE_EPS: f64 = 1e-9;

/// Predicted concentration for one measured signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// `x` such that `sigmoid(x) == signal`.
    pub log_concentration: f64,
    /// `10^x` (ug/ml).
    pub concentration: f64,
}

impl Prediction {
    /// `false` when the signal lies outside the fitted curve's range.
    pub fn is_valid(&self) -> bool {
        self.log_concentration.is_finite()
    }
}

/// Map a measured signal back to a concentration.
pub fn predict_concentration(params: &FitParams, signal: f64) -> Prediction {
    let log_concentration = sigmoid_reverse(params, signal);
    Prediction {
        log_concentration,
        concentration: 10f64.powf(log_concentration),
    }
}

/// A valid prediction below the group's lowest or above its highest control
/// concentration (compared in log10 space).
pub fn is_extrapolated(range: &ControlRange, prediction: &Prediction) -> bool {
    if !prediction.is_valid() {
        return false;
    }
    if range.is_empty() {
        return true;
    }
    let x = prediction.log_concentration;
    x < range.min_log10 - RANGE_EPS || x > range.max_log10 + RANGE_EPS
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::models::sigmoid;

    const PARAMS: FitParams = FitParams {
        inflection: 0.5,
        baseline: 0.05,
        amplitude: 2.0,
        steepness: 1.5,
    };

    const RANGE: ControlRange = ControlRange {
        min_log10: -1.0,
        max_log10: 2.0,
    };

    #[test]
    fn predicts_concentration_from_signal() {
        let y = sigmoid(&PARAMS, 1.0);
        let pred = predict_concentration(&PARAMS, y);
        assert!(pred.is_valid());
        assert_abs_diff_eq!(pred.concentration, 10.0, epsilon = 1e-8);
        assert!(!is_extrapolated(&RANGE, &pred));
    }

    #[test]
    fn range_endpoints_are_not_extrapolated() {
        for x in [-1.0, 2.0] {
            let pred = predict_concentration(&PARAMS, sigmoid(&PARAMS, x));
            assert!(!is_extrapolated(&RANGE, &pred), "x={x}");
        }
    }

    #[test]
    fn beyond_range_is_extrapolated() {
        for x in [-1.5, 2.5] {
            let pred = predict_concentration(&PARAMS, sigmoid(&PARAMS, x));
            assert!(is_extrapolated(&RANGE, &pred), "x={x}");
        }
    }

    #[test]
    fn out_of_curve_signal_propagates_non_finite() {
        let above = predict_concentration(&PARAMS, 3.0);
        assert!(!above.is_valid());
        assert!(above.concentration.is_nan());
        assert!(!is_extrapolated(&RANGE, &above));

        // y == baseline: x = -inf, so 10^x collapses to 0.
        let at_baseline = predict_concentration(&PARAMS, PARAMS.baseline);
        assert!(!at_baseline.is_valid());
        assert_eq!(at_baseline.concentration, 0.0);
    }
}
