//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (snapshot-style tests below)

use crate::domain::{
    COLS, FileResult, FitParams, GroupFit, Highlight, PlateLayout, PlateResult, ROW_LABELS,
    WellLabel, WellPos,
};
use crate::io::{FitReport, RunReport, format_value};
use crate::report::FlagCounts;

/// Template map and per-group well counts.
pub fn format_classification(layout: &PlateLayout) -> String {
    let mut out = String::new();
    let classification = &layout.classification;

    out.push_str(&format!(
        "Template: {}\n",
        if classification.is_grouped() { "grouped" } else { "ungrouped" }
    ));

    out.push_str(&format!("{:>3}", ""));
    for c in 1..=COLS {
        out.push_str(&format!("{c:>5}"));
    }
    out.push('\n');
    for (r, row) in layout.labels.rows().enumerate() {
        out.push_str(&format!("{:>3}", ROW_LABELS[r]));
        for label in row {
            let cell = match label {
                WellLabel::Empty => ".".to_string(),
                other => other.to_string(),
            };
            out.push_str(&format!("{cell:>5}"));
        }
        out.push('\n');
    }

    out.push('\n');
    for (key, masks) in classification.groups() {
        let concentrations: Vec<f64> = masks
            .control
            .positions()
            .filter_map(|w| layout.concentrations[w])
            .collect();
        let lo = concentrations.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = concentrations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = if lo.is_finite() {
            format!("standards {} .. {} ug/ml", fmt_num(lo), fmt_num(hi))
        } else {
            "no standards".to_string()
        };
        out.push_str(&format!(
            "- {key}: {} control, {} experimental, {range}\n",
            masks.control.count(),
            masks.experimental.count()
        ));
    }

    out
}

/// Header + per-plate fit diagnostics for a finished run.
pub fn format_run_summary(layout: &PlateLayout, files: &[FileResult]) -> String {
    let mut out = String::new();

    let plates: usize = files.iter().map(|f| f.plates.len()).sum();
    out.push_str("=== plate - 4PL standard curves ===\n");
    out.push_str(&format!(
        "Template: {} ({} group(s))\n",
        if layout.classification.is_grouped() { "grouped" } else { "ungrouped" },
        layout.classification.groups().len()
    ));
    out.push_str(&format!("Data: {} file(s), {plates} plate(s)\n", files.len()));

    let mut total = FlagCounts::default();
    for file in files {
        for plate in &file.plates {
            out.push_str(&format!("\n{} / {}\n", file.name, plate.name));
            out.push_str(&format_fit_table(&plate.fits));
            let counts = FlagCounts::from_result(&plate.result);
            out.push_str(&format!("  flags: {}\n", fmt_counts(&counts)));
            total.add(&counts);
        }
    }

    out.push_str(&format!("\nTotal flags: {}\n", fmt_counts(&total)));
    out
}

/// Group fit diagnostics as a small table.
pub fn format_fit_table(fits: &[GroupFit]) -> String {
    let rows: Vec<FitRow> = fits
        .iter()
        .map(|fit| FitRow {
            group: fit.key.to_string(),
            n: fit.points.len(),
            status: fit.status.describe().to_string(),
            rmse: fit.rmse,
            params: fit.params.is_finite().then_some(fit.params),
        })
        .collect();
    fit_table(&rows)
}

/// One plate's result grid with flag markers.
///
/// Markers: `c` control, `*` extrapolated, `!` invalid, `?` missing, `0` zero.
pub fn format_result_grid(plate: &PlateResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", plate.name));
    out.push_str(&format!("{:>3}", ""));
    for c in 1..=COLS {
        out.push_str(&format!("{c:>11}"));
    }
    out.push('\n');

    for (r, label) in ROW_LABELS.iter().enumerate() {
        out.push_str(&format!("{label:>3}"));
        for c in 0..COLS {
            let well = WellPos::new(r, c);
            let value = plate.result.values[well];
            let text = if value.is_finite() { format_value(value) } else { "--".to_string() };
            let mark = match plate.result.flags[well].highlight() {
                Some(Highlight::Control) => 'c',
                Some(Highlight::Extrapolated) => '*',
                Some(Highlight::Invalid) => '!',
                Some(Highlight::Missing) => '?',
                Some(Highlight::Zero) => '0',
                None => ' ',
            };
            out.push_str(&format!("{text:>10}{mark}"));
        }
        out.push('\n');
    }
    out
}

/// Summary of a saved JSON report (`plate show`).
pub fn format_report(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Report: {} | generated {} | {}\n",
        report.tool,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        if report.grouped { "grouped" } else { "ungrouped" }
    ));
    for file in &report.files {
        for plate in &file.plates {
            out.push_str(&format!("\n{} / {}\n", file.name, plate.name));
            let rows: Vec<FitRow> = plate.fits.iter().map(FitRow::from_report).collect();
            out.push_str(&fit_table(&rows));
        }
    }
    out
}

struct FitRow {
    group: String,
    n: usize,
    status: String,
    rmse: f64,
    params: Option<FitParams>,
}

impl FitRow {
    fn from_report(fit: &FitReport) -> Self {
        Self {
            group: fit
                .group
                .map(|g| format!("group {g}"))
                .unwrap_or_else(|| "all wells".to_string()),
            n: fit.points.len(),
            status: fit.status.describe().to_string(),
            rmse: fit.rmse.unwrap_or(f64::NAN),
            params: fit.params,
        }
    }
}

fn fit_table(rows: &[FitRow]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "  {:<10} {:>3} {:<26} {:>10} {:>9} {:>9} {:>9} {:>9}",
            "group", "n", "status", "rmse", "x0", "y0", "c", "k"
        )
        .trim_end(),
    );
    out.push('\n');
    for row in rows {
        let params = match row.params {
            Some(p) => format!(
                "{:>9.4} {:>9.4} {:>9.4} {:>9.4}",
                p.inflection, p.baseline, p.amplitude, p.steepness
            ),
            None => format!("{:>9} {:>9} {:>9} {:>9}", "-", "-", "-", "-"),
        };
        out.push_str(
            format!(
                "  {:<10} {:>3} {:<26} {:>10} {params}",
                row.group,
                row.n,
                row.status,
                fmt_num(row.rmse)
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn fmt_counts(c: &FlagCounts) -> String {
    format!(
        "missing={} invalid={} extrapolated={} zero={} control={}",
        c.missing, c.invalid, c.extrapolated, c.zero, c.control
    )
}

fn fmt_num(v: f64) -> String {
    if v.is_finite() { format!("{v:.4}") } else { "-".to_string() }
}
