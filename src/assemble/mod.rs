//! Result assembly: per-well values and flags for one plate.
//!
//! One pass per group writes only that group's wells:
//!
//! - control well → its known reference concentration
//! - experimental well → concentration predicted from its signal with the
//!   group's own fit and control range
//!
//! Wells covered by no group keep the `0.0` placeholder. Rounding to 3
//! decimals is the terminal step, applied after every pass; the zero flag is
//! computed on the rounded value.

use crate::domain::{
    Classification, Grid, GroupFit, GroupMasks, Plate, ResultGrid, WellFlags, WellPos,
};
use crate::math::round_to;
use crate::predict::{is_extrapolated, predict_concentration};

/// Decimal places kept in the final result grid.
pub const RESULT_DECIMALS: i32 = 3;

/// Assemble the result grid for one plate.
///
/// `fits` must be in the same order as `classification.groups()`.
pub fn assemble_plate(
    plate: &Plate,
    classification: &Classification,
    concentrations: &Grid<Option<f64>>,
    fits: &[GroupFit],
) -> ResultGrid {
    let mut values = Grid::filled(0.0);
    let mut flags = Grid::filled(WellFlags::default());

    for ((key, masks), fit) in classification.groups().into_iter().zip(fits) {
        debug_assert_eq!(key, fit.key, "fits out of order with classification groups");
        apply_group_pass(&mut values, &mut flags, plate, masks, concentrations, fit);
    }

    for well in WellPos::all() {
        let rounded = round_to(values[well], RESULT_DECIMALS);
        values[well] = rounded;
        flags[well].zero_value = rounded == 0.0;
    }

    ResultGrid { values, flags }
}

fn apply_group_pass(
    values: &mut Grid<f64>,
    flags: &mut Grid<WellFlags>,
    plate: &Plate,
    masks: &GroupMasks,
    concentrations: &Grid<Option<f64>>,
    fit: &GroupFit,
) {
    for well in masks.control.positions() {
        values[well] = concentrations[well].unwrap_or(f64::NAN);
        flags[well].is_control = true;
    }

    for well in masks.experimental.positions() {
        match plate.signals[well] {
            None => {
                values[well] = f64::NAN;
                flags[well].missing_signal = true;
            }
            Some(signal) => {
                let prediction = predict_concentration(&fit.params, signal);
                values[well] = prediction.concentration;
                flags[well].invalid_prediction = !prediction.is_valid();
                flags[well].extrapolated = is_extrapolated(&fit.range, &prediction);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use approx::assert_relative_eq;

    use super::*;
    use crate::classify::{classify, parse_template};
    use crate::domain::{FitParams, GroupKey, Highlight, Mask};
    use crate::fit::{FitOptions, fit_group};
    use crate::models::sigmoid;

    const TRUTH: FitParams = FitParams {
        inflection: 0.5,
        baseline: 0.05,
        amplitude: 2.0,
        steepness: 1.5,
    };

    /// Column 1 holds controls at {0.1, 1, 10, 100} ug/ml (rows A–D, duplicated
    /// in rows E–H); every other well is experimental.
    fn ungrouped_plate() -> (Plate, Classification, Grid<Option<f64>>) {
        let standards: [f64; 4] = [0.1, 1.0, 10.0, 100.0];
        let control = Mask::from_fn(|p| p.col == 0);
        let experimental = Mask::from_fn(|p| p.col != 0);
        let concentrations = Grid::from_fn(|p| {
            if p.col == 0 {
                Some(standards[p.row % 4])
            } else {
                None
            }
        });
        let signals = Grid::from_fn(|p| {
            if p.col == 0 {
                Some(sigmoid(&TRUTH, standards[p.row % 4].log10()))
            } else {
                // Every experimental well reads like the 10 ug/ml standard.
                Some(sigmoid(&TRUTH, 1.0))
            }
        });
        let plate = Plate {
            name: "plate_1".to_string(),
            signals,
        };
        let classification = Classification::Ungrouped {
            masks: GroupMasks {
                control,
                experimental,
            },
        };
        (plate, classification, concentrations)
    }

    fn fit_all(
        plate: &Plate,
        classification: &Classification,
        concentrations: &Grid<Option<f64>>,
    ) -> Vec<GroupFit> {
        classification
            .groups()
            .into_iter()
            .map(|(key, masks)| fit_group(key, plate, masks, concentrations, &FitOptions::default()))
            .collect()
    }

    #[test]
    fn end_to_end_prediction_inside_control_range() {
        let (plate, classification, concentrations) = ungrouped_plate();
        let fits = fit_all(&plate, &classification, &concentrations);
        let result = assemble_plate(&plate, &classification, &concentrations, &fits);

        let well = WellPos::new(2, 5);
        let value = result.values[well];
        assert!((value - 10.0).abs() <= 0.5, "predicted {value}");
        let flags = result.flags[well];
        assert!(!flags.extrapolated);
        assert!(!flags.invalid_prediction);
        assert!(!flags.is_control);
        assert_eq!(flags.highlight(), None);

        let control = WellPos::new(3, 0);
        assert_eq!(result.values[control], 100.0);
        assert_eq!(result.flags[control].highlight(), Some(Highlight::Control));
    }

    #[test]
    fn missing_signal_flags_without_zero() {
        let (mut plate, classification, concentrations) = ungrouped_plate();
        let well = WellPos::new(0, 7);
        plate.signals.set(well, None);
        let fits = fit_all(&plate, &classification, &concentrations);
        let result = assemble_plate(&plate, &classification, &concentrations, &fits);

        let flags = result.flags[well];
        assert!(flags.missing_signal);
        assert!(!flags.zero_value);
        assert!(result.values[well].is_nan());
        assert_eq!(flags.highlight(), Some(Highlight::Missing));
    }

    #[test]
    fn value_rounding_to_zero_sets_zero_flag() {
        let (mut plate, classification, concentrations) = ungrouped_plate();
        // Far below the lowest standard: predicted concentration rounds to 0.000.
        let well = WellPos::new(4, 4);
        plate.signals.set(well, Some(sigmoid(&TRUTH, -5.0)));
        let fits = fit_all(&plate, &classification, &concentrations);
        let result = assemble_plate(&plate, &classification, &concentrations, &fits);

        assert_eq!(result.values[well], 0.0);
        let flags = result.flags[well];
        assert!(flags.zero_value);
        assert!(flags.extrapolated);
        assert_eq!(flags.highlight(), Some(Highlight::Zero));
    }

    #[test]
    fn signal_above_curve_is_invalid() {
        let (mut plate, classification, concentrations) = ungrouped_plate();
        let well = WellPos::new(6, 9);
        plate.signals.set(well, Some(10.0));
        let fits = fit_all(&plate, &classification, &concentrations);
        let result = assemble_plate(&plate, &classification, &concentrations, &fits);

        let flags = result.flags[well];
        assert!(flags.invalid_prediction);
        assert!(!flags.extrapolated);
        assert!(!result.values[well].is_finite());
        assert_eq!(flags.highlight(), Some(Highlight::Invalid));
    }

    #[test]
    fn values_are_rounded_to_three_decimals() {
        let (plate, classification, concentrations) = ungrouped_plate();
        let fits = fit_all(&plate, &classification, &concentrations);
        let result = assemble_plate(&plate, &classification, &concentrations, &fits);
        for (_, &v) in result.values.iter() {
            if v.is_finite() {
                assert_eq!(v, round_to(v, RESULT_DECIMALS));
            }
        }
    }

    #[test]
    fn grouped_passes_use_their_own_curve_and_range() {
        // Group 1 (rows A–D) and group 2 (rows E–H) have different curves and
        // different control ranges; row H, column 12 belongs to no group.
        let group_two = FitParams {
            inflection: 2.0,
            baseline: 0.2,
            amplitude: 1.0,
            steepness: 2.0,
        };
        let low: [f64; 4] = [0.1, 1.0, 10.0, 100.0];
        let high: [f64; 4] = [10.0, 100.0, 1000.0, 10000.0];

        let in_group = |p: WellPos, g: usize| (p.row / 4) + 1 == g && !(p.row == 7 && p.col == 11);
        let mut groups = BTreeMap::new();
        for g in 1..=2usize {
            groups.insert(
                g as u32,
                GroupMasks {
                    control: Mask::from_fn(|p| in_group(p, g) && p.col == 0),
                    experimental: Mask::from_fn(|p| in_group(p, g) && p.col != 0),
                },
            );
        }
        let classification = Classification::Grouped { groups };

        let concentrations = Grid::from_fn(|p| match (p.row / 4, p.col) {
            (0, 0) => Some(low[p.row % 4]),
            (1, 0) => Some(high[p.row % 4]),
            _ => None,
        });
        let signals = Grid::from_fn(|p| match (p.row / 4, p.col) {
            (0, 0) => Some(sigmoid(&TRUTH, low[p.row % 4].log10())),
            (1, 0) => Some(sigmoid(&group_two, high[p.row % 4].log10())),
            // 5 ug/ml: inside group 1's range, below group 2's lowest standard.
            (0, _) => Some(sigmoid(&TRUTH, 5f64.log10())),
            _ => Some(sigmoid(&group_two, 5f64.log10())),
        });
        let plate = Plate {
            name: "plate_1".to_string(),
            signals,
        };

        let fits = fit_all(&plate, &classification, &concentrations);
        assert_eq!(fits[0].key, GroupKey::Index(1));
        assert_eq!(fits[1].key, GroupKey::Index(2));
        assert_eq!(fits[1].range.min_log10, 1.0);

        let result = assemble_plate(&plate, &classification, &concentrations, &fits);

        let g1 = WellPos::new(1, 3);
        let g2 = WellPos::new(5, 3);
        assert!((result.values[g1] - 5.0).abs() < 0.25, "{}", result.values[g1]);
        assert!((result.values[g2] - 5.0).abs() < 0.25, "{}", result.values[g2]);
        assert!(!result.flags[g1].extrapolated);
        assert!(result.flags[g2].extrapolated);

        let unassigned = WellPos::new(7, 11);
        assert_eq!(result.values[unassigned], 0.0);
        assert!(result.flags[unassigned].zero_value);
        assert!(!result.flags[unassigned].is_control);
    }

    /// Four standards in A1:D1, one sample in A2, every other well blank in the template.
    fn four_standard_plate(signals: [f64; 4], sample: f64) -> (Plate, Classification, Grid<Option<f64>>) {
        let standards = [0.1, 1.0, 10.0, 100.0];
        let raw = Grid::from_fn(|p| match (p.row, p.col) {
            (0..=3, 0) => "C".to_string(),
            (0, 1) => "E".to_string(),
            _ => String::new(),
        });
        let classification = classify(&parse_template(&raw)).unwrap();
        let concentrations = Grid::from_fn(|p| (p.col == 0 && p.row < 4).then(|| standards[p.row]));
        let plate = Plate {
            name: "plate_1".to_string(),
            signals: Grid::from_fn(|p| match (p.row, p.col) {
                (0..=3, 0) => Some(signals[p.row]),
                (0, 1) => Some(sample),
                // Readings in unused wells are ignored.
                _ => Some(0.5),
            }),
        };
        (plate, classification, concentrations)
    }

    #[test]
    fn four_increasing_standards_predict_inside_range() {
        let (plate, classification, concentrations) = four_standard_plate([0.08, 0.25, 1.1, 1.9], 1.1);
        let fits = fit_all(&plate, &classification, &concentrations);
        assert_eq!(fits[0].points.len(), 4);
        let result = assemble_plate(&plate, &classification, &concentrations, &fits);

        let sample = WellPos::new(0, 1);
        assert_relative_eq!(result.values[sample], 10.0, max_relative = 0.05);
        assert!(!result.flags[sample].extrapolated);
        assert!(!result.flags[sample].invalid_prediction);
        assert_eq!(result.flags[sample].highlight(), None);
    }

    #[test]
    fn blank_template_well_is_zero_placeholder() {
        let (plate, classification, concentrations) = four_standard_plate([0.08, 0.25, 1.1, 1.9], 1.1);
        let fits = fit_all(&plate, &classification, &concentrations);
        let result = assemble_plate(&plate, &classification, &concentrations, &fits);

        let blank = WellPos::new(5, 7);
        assert_eq!(result.values[blank], 0.0);
        let flags = result.flags[blank];
        assert!(flags.zero_value);
        assert!(!flags.missing_signal);
        assert!(!flags.is_control);
        assert_eq!(flags.highlight(), Some(Highlight::Zero));
    }
}
