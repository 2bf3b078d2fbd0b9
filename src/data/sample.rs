//! Synthetic plate generation for `plate simulate`.
//!
//! Each group occupies a band of rows. Its first two columns hold a serial
//! dilution of standards (100 down to 0.1 ug/ml); the remaining wells are
//! experimental samples with a log-uniform true concentration. Signals are
//! drawn from a per-group sigmoid plus Gaussian noise, so a run over the
//! generated files should recover concentrations close to the truth.

use std::path::{Path, PathBuf};

use log::info;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{FitParams, Grid, Plate, ROWS, SimulateConfig, WellPos};
use crate::error::AppError;
use crate::io::{ensure_dir, write_data_file, write_grid_csv};
use crate::math::round_to;
use crate::models::sigmoid;

/// Highest standard (ug/ml); the dilution series spans three decades below it.
pub const TOP_STANDARD: f64 = 100.0;
const DILUTION_DECADES: f64 = 3.0;
/// Control columns per band.
const CONTROL_COLS: usize = 2;
/// log10 range of experimental true concentrations.
const SAMPLE_LOG_RANGE: (f64, f64) = (-1.5, 2.5);
pub const MAX_GROUPS: u32 = 4;

/// Everything `plate simulate` writes.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub template: Grid<String>,
    pub concentrations: Grid<Option<f64>>,
    /// Known concentration behind every well's signal (standards included).
    pub truth: Grid<f64>,
    /// Generating curve per group (index 0 is group 1).
    pub curves: Vec<FitParams>,
    /// `(file stem, plates)`.
    pub files: Vec<(String, Vec<Plate>)>,
}

/// Paths written by `write_sample`.
#[derive(Debug, Clone)]
pub struct SamplePaths {
    pub template: PathBuf,
    pub concentrations: PathBuf,
    pub data_dir: PathBuf,
}

pub fn generate_sample(config: &SimulateConfig) -> Result<SampleData, AppError> {
    if config.files == 0 || config.plates == 0 {
        return Err(AppError::config("File and plate counts must be > 0."));
    }
    if !(1..=MAX_GROUPS).contains(&config.groups) {
        return Err(AppError::config(
            format!("Group count must be between 1 and {MAX_GROUPS}."),
        ));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(AppError::config("Noise must be finite and >= 0."));
    }
    if !(0.0..1.0).contains(&config.missing) {
        return Err(AppError::config("Missing probability must be in [0, 1)."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise)
        .map_err(|e| AppError::config(format!("Noise distribution error: {e}")))?;

    let groups = config.groups as usize;
    let band = |well: WellPos| well.row * groups / ROWS;
    let is_control = |well: WellPos| well.col < CONTROL_COLS;

    let template = Grid::from_fn(|well| {
        let marker = if is_control(well) { 'C' } else { 'E' };
        if groups == 1 {
            marker.to_string()
        } else {
            format!("{marker}{}", band(well) + 1)
        }
    });

    let concentrations = dilution_series(groups, band, is_control);

    let curves: Vec<FitParams> = (0..groups)
        .map(|_| FitParams {
            inflection: 0.5 + rng.gen_range(-0.3..0.3),
            baseline: 0.05 + rng.gen_range(0.0..0.05),
            amplitude: 2.0 * rng.gen_range(0.8..1.2),
            steepness: 1.5 * rng.gen_range(0.8..1.2),
        })
        .collect();

    let truth = Grid::from_fn(|well| match concentrations[well] {
        Some(c) => c,
        None => round_to(
            10f64.powf(rng.gen_range(SAMPLE_LOG_RANGE.0..SAMPLE_LOG_RANGE.1)),
            4,
        ),
    });

    let mut files = Vec::with_capacity(config.files);
    for f in 0..config.files {
        let mut plates = Vec::with_capacity(config.plates);
        for p in 0..config.plates {
            let signals = Grid::from_fn(|well| {
                if !is_control(well) && rng.r#gen::<f64>() < config.missing {
                    return None;
                }
                let curve = &curves[band(well)];
                let y = sigmoid(curve, truth[well].log10()) + noise.sample(&mut rng);
                Some(y.max(0.0))
            });
            plates.push(Plate {
                name: format!("plate_{}", p + 1),
                signals,
            });
        }
        files.push((format!("run_{:02}", f + 1), plates));
    }

    Ok(SampleData {
        template,
        concentrations,
        truth,
        curves,
        files,
    })
}

/// Standards from `TOP_STANDARD` down three decades across each band's
/// control wells (row-major within the band).
fn dilution_series(
    groups: usize,
    band: impl Fn(WellPos) -> usize,
    is_control: impl Fn(WellPos) -> bool,
) -> Grid<Option<f64>> {
    let mut out = Grid::filled(None);
    for g in 0..groups {
        let wells: Vec<WellPos> = WellPos::all()
            .filter(|&w| band(w) == g && is_control(w))
            .collect();
        let steps = wells.len().saturating_sub(1).max(1) as f64;
        for (j, well) in wells.into_iter().enumerate() {
            let log = TOP_STANDARD.log10() - DILUTION_DECADES * j as f64 / steps;
            out.set(well, Some(round_to(10f64.powf(log), 4)));
        }
    }
    out
}

/// Write template, concentrations and data files under `dir`.
pub fn write_sample(dir: &Path, sample: &SampleData) -> Result<SamplePaths, AppError> {
    let data_dir = dir.join("data");
    ensure_dir(&data_dir)?;

    let template = dir.join("template.csv");
    write_grid_csv(&template, &sample.template)?;

    let concentrations = dir.join("concentrations.csv");
    let conc_cells = sample
        .concentrations
        .map(|c| c.map(|v| v.to_string()).unwrap_or_default());
    write_grid_csv(&concentrations, &conc_cells)?;

    for (name, plates) in &sample.files {
        let path = data_dir.join(format!("{name}.csv"));
        write_data_file(&path, plates)?;
        info!("Wrote {} ({} plate(s))", path.display(), plates.len());
    }

    Ok(SamplePaths {
        template,
        concentrations,
        data_dir,
    })
}
