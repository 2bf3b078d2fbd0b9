//! Plate-reader export ingest.
//!
//! A data file is the CSV export of the reader's calculation sheet. It holds
//! any number of plate blocks, each introduced by a row whose first cell
//! contains the plate marker (e.g. `Plate 1`, `Plate:`):
//!
//! ```text
//! +0   Plate 1 ...            <- marker row
//! +1   ...                    (reader metadata)
//! +2   ,1,2,...,12            (column header)
//! +3   A,v,v,...,v            <- first data row
//! ...
//! +10  H,v,v,...,v            <- last data row
//! ```
//!
//! Design goals:
//! - **Lenient cells**: empty or non-numeric cells are missing measurements,
//!   not errors; the fitter and assembler deal with them per well
//! - **Strict files**: a file that cannot be read is a hard error, a file with
//!   no plate marker is skipped with a warning
//! - **Deterministic order**: files sorted by name, plates by position
//!
//! Offsets count CSV records. Fully empty lines are skipped by the reader, so
//! exports are expected to pad blank rows with commas (spreadsheet exports do).
//! A block whose `+2` row is not the `1..12` column header is still read, with
//! a warning that its window may be shifted.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::domain::{COLS, Grid, Plate, WellPos};
use crate::error::AppError;

/// Offset from the marker row to the first data row.
pub const DATA_ROW_OFFSET: usize = 3;
/// Column holding the first well value (column 0 carries row letters).
pub const DATA_COL_OFFSET: usize = 1;
/// Offset from the marker row to the `1..12` column header.
pub const HEADER_ROW_OFFSET: usize = 2;

/// All plates read from one data file.
#[derive(Debug, Clone)]
pub struct DataFile {
    /// File stem; names the file's result sheet.
    pub name: String,
    pub plates: Vec<Plate>,
}

/// List `*.csv` files directly inside `dir`, sorted by file name.
pub fn discover_data_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::no_data(
            format!("Failed to read data directory '{}': {e}", dir.display()),
        )
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            AppError::no_data(format!("Failed to list '{}': {e}", dir.display()))
        })?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read one data file.
///
/// Returns `Ok(None)` when the file contains no plate block.
pub fn load_data_file(path: &Path, marker: &str) -> Result<Option<DataFile>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open data file '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::config(
                format!("Failed to read '{}' (line {}): {e}", path.display(), idx + 1),
            )
        })?;
        records.push(record.iter().map(str::to_string).collect::<Vec<String>>());
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let plates = parse_plates(&records, marker, &name);
    if plates.is_empty() {
        warn!(
            "{}: no plate marker '{marker}' found; file skipped",
            path.display()
        );
        return Ok(None);
    }

    info!("{}: {} plate(s)", path.display(), plates.len());
    Ok(Some(DataFile {
        name,
        plates,
    }))
}

/// Extract every plate block from raw rows.
///
/// Rows past the end of the file read as empty, so a truncated final block
/// yields a plate with missing measurements rather than an error.
pub fn parse_plates(records: &[Vec<String>], marker: &str, source: &str) -> Vec<Plate> {
    let starts: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, row)| row.first().is_some_and(|cell| cell.contains(marker)))
        .map(|(idx, _)| idx)
        .collect();

    starts
        .into_iter()
        .enumerate()
        .map(|(n, start)| {
            let name = format!("plate_{}", n + 1);
            if !has_column_header(records, start) {
                warn!(
                    "{source} {name}: row {} is not the 1..12 column header; block may be shifted",
                    start + HEADER_ROW_OFFSET + 1
                );
            }
            let mut unreadable = Vec::new();
            let signals = Grid::from_fn(|well: WellPos| {
                let cell = records
                    .get(start + DATA_ROW_OFFSET + well.row)
                    .and_then(|row| row.get(DATA_COL_OFFSET + well.col))
                    .map(String::as_str)
                    .unwrap_or("");
                let value = parse_cell(cell);
                if value.is_none() && !cell.is_empty() {
                    unreadable.push(well);
                }
                value
            });
            if let Some(first) = unreadable.first() {
                warn!(
                    "{source} {name}: {} unreadable cell(s) treated as missing (first: {first})",
                    unreadable.len()
                );
            }
            Plate { name, signals }
        })
        .collect()
}

/// Whether the block starting at `start` has the well-column header where expected.
pub fn has_column_header(records: &[Vec<String>], start: usize) -> bool {
    let Some(header) = records.get(start + HEADER_ROW_OFFSET) else {
        return false;
    };
    (0..COLS).all(|c| {
        header
            .get(DATA_COL_OFFSET + c)
            .is_some_and(|cell| cell.trim() == (c + 1).to_string())
    })
}

fn parse_cell(cell: &str) -> Option<f64> {
    let v = cell.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ROW_LABELS, ROWS};

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn block(marker_cell: &str, value: impl Fn(usize, usize) -> String) -> Vec<Vec<String>> {
        let mut out = vec![row(&[marker_cell]), row(&["Read 1:450"])];
        let mut header = vec![String::new()];
        header.extend((1..=COLS).map(|c| c.to_string()));
        out.push(header);
        for r in 0..ROWS {
            let mut cells = vec![ROW_LABELS[r].to_string()];
            cells.extend((0..COLS).map(|c| value(r, c)));
            out.push(cells);
        }
        out
    }

    #[test]
    fn reads_block_at_fixed_offsets() {
        let mut records = vec![row(&["Software Version", "3.1"]), row(&[])];
        records.extend(block("Plate 1", |r, c| format!("{}.{}", r, c + 10)));

        let plates = parse_plates(&records, "Plate", "run1");
        assert_eq!(plates.len(), 1);
        assert_eq!(plates[0].name, "plate_1");
        assert_eq!(plates[0].signals[WellPos::new(0, 0)], Some(0.10));
        assert_eq!(plates[0].signals[WellPos::new(7, 11)], Some(7.21));
    }

    #[test]
    fn empty_and_garbage_cells_are_missing() {
        let records = block("Plate:", |r, c| match (r, c) {
            (0, 0) => String::new(),
            (1, 1) => "OVRFLW".to_string(),
            _ => "1.5".to_string(),
        });
        let plates = parse_plates(&records, "Plate", "run1");
        let signals = &plates[0].signals;
        assert_eq!(signals[WellPos::new(0, 0)], None);
        assert_eq!(signals[WellPos::new(1, 1)], None);
        assert_eq!(signals[WellPos::new(2, 2)], Some(1.5));
    }

    #[test]
    fn multiple_blocks_are_numbered_in_order() {
        let mut records = block("Plate 1", |_, _| "1".to_string());
        records.push(row(&[]));
        records.extend(block("Plate 2", |_, _| "2".to_string()));

        let plates = parse_plates(&records, "Plate", "run1");
        let names: Vec<&str> = plates.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["plate_1", "plate_2"]);
        assert_eq!(plates[1].signals[WellPos::new(3, 3)], Some(2.0));
    }

    #[test]
    fn dropped_metadata_line_breaks_header_alignment() {
        let records = block("Plate 1", |_, _| "1".to_string());
        assert!(has_column_header(&records, 0));

        // A blank line that vanished before the header shifts the whole window.
        let mut shifted = records.clone();
        shifted.remove(1);
        assert!(!has_column_header(&shifted, 0));
        let plates = parse_plates(&shifted, "Plate", "run1");
        assert_eq!(plates.len(), 1);
        assert_eq!(plates[0].signals[WellPos::new(7, 0)], None);

        assert!(!has_column_header(&records[..2], 0));
    }

    #[test]
    fn truncated_block_reads_missing() {
        let mut records = block("Plate 1", |_, _| "1".to_string());
        records.truncate(DATA_ROW_OFFSET + 2);
        let plates = parse_plates(&records, "Plate", "run1");
        assert_eq!(plates[0].signals[WellPos::new(1, 0)], Some(1.0));
        assert_eq!(plates[0].signals[WellPos::new(2, 0)], None);
    }

    #[test]
    fn file_without_marker_is_skipped() {
        let dir = std::env::temp_dir().join(format!("plate-curves-ingest-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("b.csv"), "nothing,here\n1,2\n").unwrap();
        fs::write(dir.join("a.csv"), "Plate 1\n").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let files = discover_data_files(&dir).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.csv", "b.csv"]);

        assert!(load_data_file(&files[1], "Plate").unwrap().is_none());
        let a = load_data_file(&files[0], "Plate").unwrap().unwrap();
        assert_eq!(a.name, "a");
        assert_eq!(a.plates.len(), 1);

        fs::remove_dir_all(&dir).unwrap();
    }
}
