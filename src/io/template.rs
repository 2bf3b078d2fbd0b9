//! Template and reference-concentration loading.
//!
//! Both inputs are headerless 8-row CSV grids. Only the first 12 columns are
//! read; plate-reader exports often carry a trailing blank column which is
//! ignored along with anything after it.

use std::fs::File;
use std::path::Path;

use log::info;

use crate::classify::{classify, parse_template};
use crate::domain::{COLS, Grid, PlateLayout, ROWS, WellPos};
use crate::error::AppError;

/// Read an 8×12 grid of trimmed cell strings.
///
/// Missing trailing cells (short rows) read as `""`; fewer than 8 rows is an
/// error.
pub fn read_grid_csv(path: &Path) -> Result<Grid<String>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::with_capacity(ROWS);
    for (idx, result) in reader.records().take(ROWS).enumerate() {
        let record = result.map_err(|e| {
            AppError::config(
                format!("Failed to read '{}' (row {}): {e}", path.display(), idx + 1),
            )
        })?;
        let row: Vec<String> = (0..COLS)
            .map(|c| {
                record
                    .get(c)
                    .map(|s| s.trim_start_matches('\u{feff}').to_string())
                    .unwrap_or_default()
            })
            .collect();
        rows.push(row);
    }

    Grid::from_rows(rows).map_err(|e| AppError::config(format!("'{}': {e}", path.display())))
}

/// Parse a grid of cell strings as concentrations. Blank cells are `None`.
pub fn parse_concentrations(cells: &Grid<String>) -> Result<Grid<Option<f64>>, AppError> {
    let mut out = Grid::filled(None);
    for (well, cell) in cells.iter() {
        if cell.is_empty() {
            continue;
        }
        let value = cell.parse::<f64>().map_err(|_| {
            AppError::config(format!("Invalid concentration '{cell}' in well {well}"))
        })?;
        out.set(well, Some(value));
    }
    Ok(out)
}

/// Load and classify the template, then load the concentration grid.
///
/// Every control well must carry a finite reference concentration.
pub fn load_layout(template: &Path, concentrations: &Path) -> Result<PlateLayout, AppError> {
    let labels = parse_template(&read_grid_csv(template)?);
    let classification = classify(&labels)?;
    let concentrations = parse_concentrations(&read_grid_csv(concentrations)?)?;

    let missing: Vec<WellPos> = classification
        .control_mask()
        .positions()
        .filter(|&well| !concentrations[well].is_some_and(f64::is_finite))
        .collect();
    if let Some(first) = missing.first() {
        return Err(AppError::config(
            format!(
                "Control well {first} has no concentration ({} control well(s) affected)",
                missing.len()
            ),
        ));
    }

    let groups = classification.groups();
    info!(
        "Template: {} control / {} experimental wells in {} group(s){}",
        classification.control_mask().count(),
        classification.experimental_mask().count(),
        groups.len(),
        if classification.is_grouped() { "" } else { " (ungrouped)" }
    );

    Ok(PlateLayout {
        labels,
        classification,
        concentrations,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::domain::Classification;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("plate-curves-template-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn grid_text(cell: impl Fn(usize, usize) -> String) -> String {
        let mut out = String::new();
        for r in 0..ROWS {
            let cells: Vec<String> = (0..COLS).map(|c| cell(r, c)).collect();
            // Trailing blank 13th column, as plate-reader exports have.
            out.push_str(&cells.join(","));
            out.push_str(",\n");
        }
        out
    }

    #[test]
    fn loads_ungrouped_layout_and_ignores_trailing_column() {
        let dir = temp_dir("ok");
        let template = dir.join("template.csv");
        let concs = dir.join("concentrations.csv");
        fs::write(&template, grid_text(|_, c| if c == 0 { "C".into() } else { "E".into() })).unwrap();
        fs::write(&concs, grid_text(|r, c| if c == 0 { format!("{}", 10f64.powi(r as i32 - 1)) } else { String::new() }))
            .unwrap();

        let layout = load_layout(&template, &concs).unwrap();
        assert!(matches!(layout.classification, Classification::Ungrouped { .. }));
        assert_eq!(layout.concentrations[WellPos::new(1, 0)], Some(1.0));
        assert_eq!(layout.concentrations[WellPos::new(1, 1)], None);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn control_without_concentration_is_config_error() {
        let dir = temp_dir("noconc");
        let template = dir.join("template.csv");
        let concs = dir.join("concentrations.csv");
        fs::write(&template, grid_text(|_, c| if c == 0 { "C".into() } else { "E".into() })).unwrap();
        fs::write(&concs, grid_text(|r, c| if c == 0 && r != 3 { "1".into() } else { String::new() })).unwrap();

        let err = load_layout(&template, &concs).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("D1"), "{err}");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn short_template_is_config_error() {
        let dir = temp_dir("short");
        let template = dir.join("template.csv");
        fs::write(&template, "C,E\nC,E\n").unwrap();
        let err = read_grid_csv(&template).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn bad_concentration_cell_names_the_well() {
        let cells = Grid::from_fn(|p| if p.row == 2 && p.col == 4 { "abc".to_string() } else { String::new() });
        let err = parse_concentrations(&cells).unwrap_err();
        assert!(err.to_string().contains("C5"), "{err}");
    }
}
