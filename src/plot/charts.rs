//! SVG charts rendered with Plotters.
//!
//! - fit chart: control points + fitted sigmoid over whole log10 decades
//! - prediction chart: per-well predicted concentration as bars, with the
//!   group's lowest and highest standard as reference lines
//! - plate map: the 8×12 result grid, cells filled by highlight
//!
//! Drawing code returns `Box<dyn Error>` (what Plotters composes with);
//! the public wrappers turn that into an output error naming the file.

use std::error::Error;
use std::path::Path;

use log::debug;
use plotters::prelude::*;

use crate::domain::{
    COLS, GroupFit, Grid, Highlight, Mask, ROW_LABELS, ROWS, ResultGrid, WellPos,
};
use crate::error::AppError;
use crate::io::format_value;
use crate::models::sigmoid;

/// Samples along the fitted curve.
pub const CURVE_SAMPLES: usize = 5000;

const CHART_SIZE: (u32, u32) = (800, 600);

/// Scatter of the control points with the fitted curve.
///
/// Groups without control points have nothing to draw and are skipped.
pub fn write_fit_chart(path: &Path, title: &str, fit: &GroupFit) -> Result<(), AppError> {
    if fit.points.is_empty() {
        debug!("{title}: no control points, fit chart skipped");
        return Ok(());
    }
    draw_fit_chart(path, title, fit).map_err(|e| chart_error(path, e))
}

/// Bar chart of the predicted concentrations of one group's experimental wells.
pub fn write_prediction_chart(
    path: &Path,
    title: &str,
    fit: &GroupFit,
    experimental: &Mask,
    values: &Grid<f64>,
) -> Result<(), AppError> {
    draw_prediction_chart(path, title, fit, experimental, values).map_err(|e| chart_error(path, e))
}

/// Annotated plate map of a result grid.
pub fn write_plate_map(path: &Path, title: &str, result: &ResultGrid) -> Result<(), AppError> {
    draw_plate_map(path, title, result).map_err(|e| chart_error(path, e))
}

fn chart_error(path: &Path, e: Box<dyn Error>) -> AppError {
    AppError::output(format!("Failed to render chart '{}': {e}", path.display()))
}

/// `[floor(min x), ceil(max x)]`, widened to at least one decade.
pub fn decade_bounds(fit: &GroupFit) -> (f64, f64) {
    let lo = fit.range.min_log10.floor();
    let hi = fit.range.max_log10.ceil();
    if hi > lo { (lo, hi) } else { (lo, lo + 1.0) }
}

fn draw_fit_chart(path: &Path, title: &str, fit: &GroupFit) -> Result<(), Box<dyn Error>> {
    let (x0, x1) = decade_bounds(fit);

    let curve: Vec<(f64, f64)> = if fit.params.is_finite() {
        (0..CURVE_SAMPLES)
            .map(|i| {
                let x = x0 + (x1 - x0) * i as f64 / (CURVE_SAMPLES - 1) as f64;
                (x, sigmoid(&fit.params, x))
            })
            .filter(|(_, y)| y.is_finite())
            .collect()
    } else {
        Vec::new()
    };
    let points: Vec<(f64, f64)> = fit
        .points
        .iter()
        .map(|p| (p.log_concentration, p.signal))
        .collect();

    let (y0, y1) = points
        .iter()
        .chain(curve.iter())
        .map(|&(_, y)| y)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    let pad = ((y1 - y0).abs() * 0.05).max(1e-3);
    let (y0, y1) = (y0 - pad, y1 + pad);

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc("log10 concentration (ug/ml)")
        .y_desc("signal (OD)")
        .draw()?;

    chart.draw_series(LineSeries::new(curve, &BLUE))?;
    chart.draw_series(points.iter().map(|&(x, y)| Circle::new((x, y), 4, RED.filled())))?;

    root.present()?;
    Ok(())
}

fn draw_prediction_chart(
    path: &Path,
    title: &str,
    fit: &GroupFit,
    experimental: &Mask,
    values: &Grid<f64>,
) -> Result<(), Box<dyn Error>> {
    let wells: Vec<WellPos> = experimental.positions().collect();
    let bars: Vec<(usize, f64)> = wells
        .iter()
        .enumerate()
        .filter(|(_, well)| values[**well].is_finite())
        .map(|(i, well)| (i, values[*well]))
        .collect();

    let (ref_lo, ref_hi) = if fit.range.is_empty() {
        (None, None)
    } else {
        (Some(fit.range.min_concentration()), Some(fit.range.max_concentration()))
    };

    let y_max = bars
        .iter()
        .map(|&(_, v)| v)
        .chain(ref_hi)
        .fold(0.0_f64, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };
    let n = wells.len().max(1) as f64;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..n, 0.0..y_max)?;

    let well_label = |v: &f64| {
        wells
            .get(v.floor() as usize)
            .map(|w| w.to_string())
            .unwrap_or_default()
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(wells.len().min(24))
        .x_label_formatter(&well_label)
        .x_desc("well")
        .y_desc("predicted concentration (ug/ml)")
        .draw()?;

    chart.draw_series(bars.iter().map(|&(i, v)| {
        let x = i as f64;
        Rectangle::new([(x + 0.1, 0.0), (x + 0.9, v)], BLUE.mix(0.6).filled())
    }))?;

    for (reference, color) in [(ref_lo, GREEN), (ref_hi, RED)] {
        if let Some(y) = reference {
            chart.draw_series(LineSeries::new([(0.0, y), (n, y)], &color))?;
        }
    }

    root.present()?;
    Ok(())
}

fn draw_plate_map(path: &Path, title: &str, result: &ResultGrid) -> Result<(), Box<dyn Error>> {
    const CELL_W: i32 = 80;
    const CELL_H: i32 = 44;
    const LEFT: i32 = 40;
    const TOP: i32 = 70;

    let width = LEFT + CELL_W * COLS as i32 + 20;
    let height = TOP + CELL_H * ROWS as i32 + 60;

    let root = SVGBackend::new(path, (width as u32, height as u32)).into_drawing_area();
    root.fill(&WHITE)?;

    let title_font = ("sans-serif", 22).into_font().color(&BLACK);
    let label_font = ("sans-serif", 14).into_font().color(&BLACK);
    let value_font = ("sans-serif", 13).into_font().color(&BLACK);

    root.draw(&Text::new(title.to_string(), (LEFT, 20), title_font))?;

    for c in 0..COLS {
        let x = LEFT + CELL_W * c as i32 + CELL_W / 2 - 6;
        root.draw(&Text::new((c + 1).to_string(), (x, TOP - 20), label_font.clone()))?;
    }

    for (well, value) in result.values.iter() {
        let x0 = LEFT + CELL_W * well.col as i32;
        let y0 = TOP + CELL_H * well.row as i32;
        let x1 = x0 + CELL_W;
        let y1 = y0 + CELL_H;

        if well.col == 0 {
            let label = ROW_LABELS[well.row].to_string();
            root.draw(&Text::new(label, (LEFT - 24, y0 + CELL_H / 2 - 7), label_font.clone()))?;
        }

        if let Some(highlight) = result.flags[well].highlight() {
            let (r, g, b) = highlight.rgb();
            root.draw(&Rectangle::new([(x0, y0), (x1, y1)], RGBColor(r, g, b).filled()))?;
        }
        root.draw(&Rectangle::new([(x0, y0), (x1, y1)], &BLACK))?;
        root.draw(&Text::new(format_value(*value), (x0 + 8, y0 + CELL_H / 2 - 7), value_font.clone()))?;
    }

    // Legend.
    let legend_y = TOP + CELL_H * ROWS as i32 + 20;
    let legend = [
        Highlight::Missing,
        Highlight::Invalid,
        Highlight::Extrapolated,
        Highlight::Zero,
        Highlight::Control,
    ];
    for (i, highlight) in legend.iter().enumerate() {
        let x = LEFT + i as i32 * 150;
        let (r, g, b) = highlight.rgb();
        root.draw(&Rectangle::new([(x, legend_y), (x + 18, legend_y + 18)], RGBColor(r, g, b).filled()))?;
        root.draw(&Text::new(highlight.label().to_string(), (x + 24, legend_y + 2), label_font.clone()))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::domain::{ControlPoint, ControlRange, FitParams, FitStatus, GroupKey, WellFlags};

    fn sample_fit() -> GroupFit {
        let params = FitParams {
            inflection: 0.5,
            baseline: 0.05,
            amplitude: 2.0,
            steepness: 1.5,
        };
        let points: Vec<ControlPoint> = [-1.0, 0.0, 1.0, 2.0]
            .iter()
            .enumerate()
            .map(|(i, &x)| ControlPoint {
                well: WellPos::new(i, 0),
                log_concentration: x,
                signal: sigmoid(&params, x),
            })
            .collect();
        GroupFit {
            key: GroupKey::Index(1),
            params,
            status: FitStatus::ExactFit,
            sse: 0.0,
            rmse: 0.0,
            evaluations: 3,
            range: ControlRange::from_points(&points),
            points,
        }
    }

    #[test]
    fn decade_bounds_round_outward() {
        let mut fit = sample_fit();
        assert_eq!(decade_bounds(&fit), (-1.0, 2.0));
        fit.range = ControlRange {
            min_log10: 0.3,
            max_log10: 0.3,
        };
        assert_eq!(decade_bounds(&fit), (0.0, 1.0));
    }

    #[test]
    fn writes_svg_files() {
        let dir = std::env::temp_dir().join(format!("plate-curves-charts-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let fit = sample_fit();
        let experimental = Mask::from_fn(|p| p.col > 0 && p.row < 4);
        let mut values = Grid::filled(0.0);
        for well in experimental.positions() {
            values[well] = 1.0 + well.col as f64;
        }
        values[WellPos::new(1, 5)] = f64::NAN;
        let mut flags = Grid::filled(WellFlags::default());
        flags[WellPos::new(0, 0)].is_control = true;
        flags[WellPos::new(1, 5)].missing_signal = true;

        let fit_path = dir.join("fit.svg");
        let bars_path = dir.join("bars.svg");
        let map_path = dir.join("map.svg");
        write_fit_chart(&fit_path, "run1 plate_1 group 1", &fit).unwrap();
        write_prediction_chart(&bars_path, "run1 plate_1 group 1 predictions", &fit, &experimental, &values).unwrap();
        write_plate_map(&map_path, "run1 plate_1", &ResultGrid { values, flags }).unwrap();

        for path in [&fit_path, &bars_path, &map_path] {
            let svg = fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"), "{}", path.display());
        }
        let map = fs::read_to_string(&map_path).unwrap();
        assert!(map.to_ascii_uppercase().contains("#90EE90"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
