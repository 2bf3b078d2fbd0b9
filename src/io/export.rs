//! CSV writers.
//!
//! - result sheets: one CSV per data file, plates stacked with a fixed stride
//! - flag sheets: same layout, each cell naming the highlight that applies
//! - template / concentration / plate-reader files (for `plate simulate`)
//!
//! Every row is padded to the same width so spreadsheet tools and the CSV
//! reader agree on row offsets.

use std::fs::{self, File};
use std::path::Path;

use crate::domain::{COLS, FileResult, Grid, Plate, PlateResult, ROW_LABELS, WellPos};
use crate::error::AppError;

/// Rows occupied by one plate in a result sheet: name, blank, header, A–H, blank.
pub const PLATE_STRIDE: usize = 3 + ROW_LABELS.len() + 1;

/// Row label column plus 12 well columns.
const SHEET_WIDTH: usize = COLS + 1;

/// Create `dir` (and parents) if needed.
pub fn ensure_dir(dir: &Path) -> Result<(), AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::output(format!("Failed to create directory '{}': {e}", dir.display())))
}

/// Write the value sheet for one data file.
pub fn write_results_csv(path: &Path, file: &FileResult) -> Result<(), AppError> {
    write_sheet(path, &file.plates, |plate, well| {
        format_value(plate.result.values[well])
    })
}

/// Write the flag sheet for one data file.
pub fn write_flags_csv(path: &Path, file: &FileResult) -> Result<(), AppError> {
    write_sheet(path, &file.plates, |plate, well| {
        plate.result.flags[well]
            .highlight()
            .map(|h| h.label().to_string())
            .unwrap_or_default()
    })
}

/// Three decimals; non-finite values become empty cells.
pub fn format_value(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.3}")
    } else {
        String::new()
    }
}

fn write_sheet(
    path: &Path,
    plates: &[PlateResult],
    cell: impl Fn(&PlateResult, WellPos) -> String,
) -> Result<(), AppError> {
    let mut writer = SheetWriter::create(path)?;
    for plate in plates {
        writer.row(std::iter::once(plate.name.clone()))?;
        writer.blank()?;
        writer.row(std::iter::once(String::new()).chain((1..=COLS).map(|c| c.to_string())))?;
        for (r, label) in ROW_LABELS.iter().enumerate() {
            writer.row(
                std::iter::once(label.to_string())
                    .chain((0..COLS).map(|c| cell(plate, WellPos::new(r, c)))),
            )?;
        }
        writer.blank()?;
    }
    writer.finish()
}

/// Write an 8×12 grid with no header and a trailing blank column, the shape
/// the template and concentration loaders expect.
pub fn write_grid_csv(path: &Path, grid: &Grid<String>) -> Result<(), AppError> {
    let mut writer = SheetWriter::create(path)?;
    for row in grid.rows() {
        writer.row(row.iter().cloned())?;
    }
    writer.finish()
}

/// Write plates in the plate-reader export layout read by `io::ingest`.
pub fn write_data_file(path: &Path, plates: &[Plate]) -> Result<(), AppError> {
    let mut writer = SheetWriter::create(path)?;
    writer.row(["Software Version".to_string(), "plate-curves".to_string()])?;
    writer.blank()?;
    for (n, plate) in plates.iter().enumerate() {
        writer.row([format!("Plate {}", n + 1), plate.name.clone()])?;
        writer.row(["Read 1:450".to_string()])?;
        writer.row(std::iter::once(String::new()).chain((1..=COLS).map(|c| c.to_string())))?;
        for (r, label) in plate.signals.rows().zip(ROW_LABELS) {
            writer.row(
                std::iter::once(label.to_string())
                    .chain(r.iter().map(|v| v.map(|x| format!("{x:.4}")).unwrap_or_default())),
            )?;
        }
        writer.blank()?;
    }
    writer.finish()
}

/// `csv::Writer` with fixed-width rows and path-aware errors.
struct SheetWriter<'a> {
    path: &'a Path,
    inner: csv::Writer<File>,
}

impl<'a> SheetWriter<'a> {
    fn create(path: &'a Path) -> Result<Self, AppError> {
        let inner = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| AppError::output(format!("Failed to create '{}': {e}", path.display())))?;
        Ok(Self { path, inner })
    }

    fn row(&mut self, cells: impl IntoIterator<Item = String>) -> Result<(), AppError> {
        let mut record: Vec<String> = cells.into_iter().collect();
        record.resize(record.len().max(SHEET_WIDTH), String::new());
        self.inner
            .write_record(&record)
            .map_err(|e| AppError::output(format!("Failed to write '{}': {e}", self.path.display())))
    }

    fn blank(&mut self) -> Result<(), AppError> {
        self.row(std::iter::empty())
    }

    fn finish(mut self) -> Result<(), AppError> {
        self.inner
            .flush()
            .map_err(|e| AppError::output(format!("Failed to write '{}': {e}", self.path.display())))
    }
}
