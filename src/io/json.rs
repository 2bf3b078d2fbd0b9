//! Read/write the JSON run report.
//!
//! The report is the portable, machine-readable summary of a run:
//! - per file and plate, the rounded value grid (non-finite → `null`)
//! - per group, fit parameters, solver status and the control points used
//! - a generation timestamp
//!
//! Flags are not part of the report; they live in the flag sheets.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Classification, FileResult, FitParams, FitStatus, GroupFit};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub grouped: bool,
    pub files: Vec<FileReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub name: String,
    pub plates: Vec<PlateReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateReport {
    pub name: String,
    /// Rows `A`–`H`, 12 values each.
    pub values: Vec<Vec<Option<f64>>>,
    pub fits: Vec<FitReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    /// `None` for an ungrouped template.
    pub group: Option<u32>,
    /// `None` when the fit produced non-finite parameters.
    pub params: Option<FitParams>,
    pub status: FitStatus,
    pub sse: Option<f64>,
    pub rmse: Option<f64>,
    pub evaluations: usize,
    pub min_concentration: Option<f64>,
    pub max_concentration: Option<f64>,
    /// `(log10 concentration, signal)` pairs used in the fit.
    pub points: Vec<(f64, f64)>,
}

impl FitReport {
    pub fn from_fit(fit: &GroupFit) -> Self {
        let range_known = !fit.range.is_empty();
        Self {
            group: fit.key.index(),
            params: fit.params.is_finite().then_some(fit.params),
            status: fit.status,
            sse: finite(fit.sse),
            rmse: finite(fit.rmse),
            evaluations: fit.evaluations,
            min_concentration: range_known.then(|| fit.range.min_concentration()),
            max_concentration: range_known.then(|| fit.range.max_concentration()),
            points: fit
                .points
                .iter()
                .map(|p| (p.log_concentration, p.signal))
                .collect(),
        }
    }
}

/// Build the report for a finished run.
pub fn build_report(classification: &Classification, files: &[FileResult]) -> RunReport {
    RunReport {
        tool: "plate-curves".to_string(),
        generated_at: Utc::now(),
        grouped: classification.is_grouped(),
        files: files
            .iter()
            .map(|file| FileReport {
                name: file.name.clone(),
                plates: file
                    .plates
                    .iter()
                    .map(|plate| PlateReport {
                        name: plate.name.clone(),
                        values: plate
                            .result
                            .values
                            .rows()
                            .map(|row| row.iter().copied().map(finite).collect())
                            .collect(),
                        fits: plate.fits.iter().map(FitReport::from_fit).collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Write a report as pretty JSON.
pub fn write_report_json(path: &Path, report: &RunReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::output(format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::output(format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

/// Read a report JSON file.
pub fn read_report_json(path: &Path) -> Result<RunReport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: RunReport =
        serde_json::from_reader(file).map_err(|e| AppError::config(format!("Invalid report JSON: {e}")))?;
    Ok(report)
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::domain::{
        ControlPoint, ControlRange, GroupKey, GroupMasks, Grid, Mask, PlateResult, ResultGrid, WellFlags,
        WellPos,
    };

    fn sample_files() -> (Classification, Vec<FileResult>) {
        let classification = Classification::Ungrouped {
            masks: GroupMasks {
                control: Mask::from_fn(|p| p.col == 0),
                experimental: Mask::from_fn(|p| p.col != 0),
            },
        };
        let points = vec![
            ControlPoint {
                well: WellPos::new(0, 0),
                log_concentration: -1.0,
                signal: 0.1,
            },
            ControlPoint {
                well: WellPos::new(1, 0),
                log_concentration: 2.0,
                signal: 1.9,
            },
        ];
        let fit = GroupFit {
            key: GroupKey::All,
            params: FitParams {
                inflection: 0.5,
                baseline: 0.05,
                amplitude: 2.0,
                steepness: 1.5,
            },
            status: FitStatus::ResidualTolerance,
            sse: 1e-6,
            rmse: 5e-4,
            evaluations: 17,
            range: ControlRange::from_points(&points),
            points,
        };
        let mut values = Grid::filled(1.25);
        values.set(WellPos::new(4, 4), f64::NAN);
        let plate = PlateResult {
            name: "plate_1".to_string(),
            fits: vec![fit],
            result: ResultGrid {
                values,
                flags: Grid::filled(WellFlags::default()),
            },
        };
        let files = vec![FileResult {
            name: "run1".to_string(),
            plates: vec![plate],
        }];
        (classification, files)
    }

    #[test]
    fn report_round_trips_through_disk() {
        let (classification, files) = sample_files();
        let report = build_report(&classification, &files);
        assert!(!report.grouped);

        let path = std::env::temp_dir().join(format!("plate-curves-report-{}.json", std::process::id()));
        write_report_json(&path, &report).unwrap();
        let back = read_report_json(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let plate = &back.files[0].plates[0];
        assert_eq!(plate.values.len(), 8);
        assert_eq!(plate.values[0][0], Some(1.25));
        assert_eq!(plate.values[4][4], None);

        let fit = &plate.fits[0];
        assert_eq!(fit.group, None);
        assert_eq!(fit.status, FitStatus::ResidualTolerance);
        assert_eq!(fit.params.map(|p| p.steepness), Some(1.5));
        assert_eq!(fit.points.len(), 2);
        assert_abs_diff_eq!(fit.max_concentration.unwrap(), 100.0, epsilon = 1e-9);
        assert_eq!(back.generated_at, report.generated_at);
    }

    #[test]
    fn non_finite_values_serialize_as_null() {
        let (classification, files) = sample_files();
        let json = serde_json::to_string(&build_report(&classification, &files)).unwrap();
        assert!(json.contains("null"));
        assert!(!json.contains("NaN"));
    }
}
