//! Shared batch pipeline used by `plate run` (and the integration tests).
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! template -> data files -> per-plate fits -> result grids -> outputs
//!
//! Processing is strictly sequential and completes for every file before
//! anything is written, so a failure never leaves partial outputs behind.

use std::path::PathBuf;

use log::info;

use crate::assemble::assemble_plate;
use crate::domain::{FileResult, GroupFit, PlateLayout, PlateResult, Plate, RunConfig};
use crate::error::AppError;
use crate::fit::{FitOptions, fit_group};
use crate::io::{
    build_report, discover_data_files, ensure_dir, load_data_file, load_layout, write_flags_csv,
    write_report_json, write_results_csv,
};
use crate::plot::{write_fit_chart, write_plate_map, write_prediction_chart};

/// All computed outputs of a single `plate run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub layout: PlateLayout,
    pub files: Vec<FileResult>,
}

/// Execute the full pipeline (without writing outputs).
pub fn run_batch(config: &RunConfig) -> Result<RunOutput, AppError> {
    let layout = load_layout(&config.template_path, &config.concentrations_path)?;
    run_batch_with_layout(config, layout)
}

/// Execute the pipeline with an already loaded layout.
pub fn run_batch_with_layout(config: &RunConfig, layout: PlateLayout) -> Result<RunOutput, AppError> {
    let paths = discover_data_files(&config.data_dir)?;
    if paths.is_empty() {
        return Err(AppError::no_data(format!(
            "No data files (*.csv) found in '{}'.",
            config.data_dir.display()
        )));
    }

    let opts = FitOptions {
        max_evaluations: config.max_evaluations,
    };

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let Some(data) = load_data_file(path, &config.plate_marker)? else {
            continue;
        };
        let plates = data
            .plates
            .iter()
            .map(|plate| process_plate(plate, &layout, &opts))
            .collect();
        files.push(FileResult {
            name: data.name,
            plates,
        });
    }

    if files.is_empty() {
        return Err(AppError::no_data(format!(
            "No plate blocks (marker '{}') found in any data file under '{}'.",
            config.plate_marker,
            config.data_dir.display()
        )));
    }

    Ok(RunOutput { layout, files })
}

/// Fit every group of one plate, then assemble its result grid.
pub fn process_plate(plate: &Plate, layout: &PlateLayout, opts: &FitOptions) -> PlateResult {
    let fits: Vec<GroupFit> = layout
        .classification
        .groups()
        .into_iter()
        .map(|(key, masks)| fit_group(key, plate, masks, &layout.concentrations, opts))
        .collect();
    let result = assemble_plate(plate, &layout.classification, &layout.concentrations, &fits);
    PlateResult {
        name: plate.name.clone(),
        fits,
        result,
    }
}

/// Write sheets, charts and the JSON report. Returns the paths written.
pub fn write_outputs(config: &RunConfig, run: &RunOutput) -> Result<Vec<PathBuf>, AppError> {
    let out = &config.output_dir;
    let results_dir = out.join("results");
    let flags_dir = out.join("flags");
    let pictures_dir = out.join("pictures");
    let plates_dir = out.join("plates");

    ensure_dir(&results_dir)?;
    ensure_dir(&flags_dir)?;
    if config.charts {
        ensure_dir(&pictures_dir)?;
        ensure_dir(&plates_dir)?;
    }

    let mut written = Vec::new();
    let classification = &run.layout.classification;

    for file in &run.files {
        let values = results_dir.join(format!("{}.csv", file.name));
        write_results_csv(&values, file)?;
        written.push(values);

        let flags = flags_dir.join(format!("{}.csv", file.name));
        write_flags_csv(&flags, file)?;
        written.push(flags);

        if !config.charts {
            continue;
        }
        for plate in &file.plates {
            let title = format!("{} {}", file.name, plate.name);

            let map = plates_dir.join(format!("{title}.svg"));
            write_plate_map(&map, &title, &plate.result)?;
            written.push(map);

            for ((key, masks), fit) in classification.groups().into_iter().zip(&plate.fits) {
                let fit_title = format!("{title}{}", key.suffix());
                let chart = pictures_dir.join(format!("{fit_title}.svg"));
                if !fit.points.is_empty() {
                    write_fit_chart(&chart, &fit_title, fit)?;
                    written.push(chart);
                }

                if classification.is_grouped() {
                    let bars_title = format!("{fit_title} predictions");
                    let bars = pictures_dir.join(format!("{bars_title}.svg"));
                    write_prediction_chart(&bars, &bars_title, fit, &masks.experimental, &plate.result.values)?;
                    written.push(bars);
                }
            }
        }
    }

    let report = out.join("results.json");
    write_report_json(&report, &build_report(classification, &run.files))?;
    written.push(report);

    info!("Wrote {} output file(s) under {}", written.len(), out.display());
    Ok(written)
}
