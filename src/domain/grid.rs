//! Fixed-shape plate grids.
//!
//! Every grid the pipeline handles (raw signals, template labels, reference
//! concentrations, masks, results) has the same 96-well geometry: rows `A`–`H`
//! and columns `1`–`12`. Encoding the shape in one type means shape mismatches
//! can only happen at the I/O boundary, where `Grid::from_rows` rejects them.

use std::fmt;
use std::ops::{Index, IndexMut};

/// Number of plate rows (`A`–`H`).
pub const ROWS: usize = 8;
/// Number of plate columns (`1`–`12`).
pub const COLS: usize = 12;
/// Total wells per plate.
pub const WELLS: usize = ROWS * COLS;

/// Row letters in plate order.
pub const ROW_LABELS: [char; ROWS] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

/// Zero-based well coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WellPos {
    pub row: usize,
    pub col: usize,
}

impl WellPos {
    pub fn new(row: usize, col: usize) -> Self {
        debug_assert!(row < ROWS && col < COLS, "well ({row}, {col}) outside plate");
        Self { row, col }
    }

    /// All 96 wells in row-major order (A1, A2, ..., H12).
    pub fn all() -> impl Iterator<Item = WellPos> {
        (0..WELLS).map(|i| WellPos::new(i / COLS, i % COLS))
    }

    fn offset(self) -> usize {
        self.row * COLS + self.col
    }
}

impl fmt::Display for WellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ROW_LABELS[self.row], self.col + 1)
    }
}

/// An 8×12 grid stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn filled(value: T) -> Self {
        Self {
            cells: vec![value; WELLS],
        }
    }
}

impl<T> Grid<T> {
    pub fn from_fn(mut f: impl FnMut(WellPos) -> T) -> Self {
        Self {
            cells: WellPos::all().map(&mut f).collect(),
        }
    }

    /// Build a grid from nested rows, rejecting anything that is not 8×12.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, String> {
        if rows.len() != ROWS {
            return Err(format!("expected {ROWS} rows, found {}", rows.len()));
        }
        let mut cells = Vec::with_capacity(WELLS);
        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != COLS {
                return Err(format!(
                    "row {} has {} columns, expected {COLS}",
                    ROW_LABELS[r],
                    row.len()
                ));
            }
            cells.extend(row);
        }
        Ok(Self { cells })
    }

    pub fn get(&self, pos: WellPos) -> &T {
        &self.cells[pos.offset()]
    }

    pub fn set(&mut self, pos: WellPos, value: T) {
        self.cells[pos.offset()] = value;
    }

    /// Iterate `(position, value)` pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (WellPos, &T)> {
        WellPos::all().zip(self.cells.iter())
    }

    /// Iterate rows as slices of length `COLS`.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(COLS)
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            cells: self.cells.iter().map(&mut f).collect(),
        }
    }
}

impl<T> Index<WellPos> for Grid<T> {
    type Output = T;

    fn index(&self, pos: WellPos) -> &T {
        self.get(pos)
    }
}

impl<T> IndexMut<WellPos> for Grid<T> {
    fn index_mut(&mut self, pos: WellPos) -> &mut T {
        &mut self.cells[pos.offset()]
    }
}

/// Boolean well selection (e.g. "control wells of group 2").
pub type Mask = Grid<bool>;

impl Grid<bool> {
    pub fn empty() -> Self {
        Self::filled(false)
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&v| v).count()
    }

    /// Positions where the mask is set, in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = WellPos> + '_ {
        self.iter().filter(|(_, v)| **v).map(|(pos, _)| pos)
    }

    pub fn overlaps(&self, other: &Mask) -> bool {
        self.cells.iter().zip(other.cells.iter()).any(|(a, b)| *a && *b)
    }

    pub fn union(&self, other: &Mask) -> Mask {
        Grid {
            cells: self
                .cells
                .iter()
                .zip(other.cells.iter())
                .map(|(a, b)| *a || *b)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_names_follow_plate_convention() {
        assert_eq!(WellPos::new(0, 0).to_string(), "A1");
        assert_eq!(WellPos::new(7, 11).to_string(), "H12");
        assert_eq!(WellPos::all().count(), 96);
    }

    #[test]
    fn from_rows_rejects_wrong_shape() {
        let short = vec![vec![0.0; COLS]; ROWS - 1];
        assert!(Grid::from_rows(short).is_err());

        let mut narrow = vec![vec![0.0; COLS]; ROWS];
        narrow[3].pop();
        let err = Grid::from_rows(narrow).unwrap_err();
        assert!(err.contains("row D"), "{err}");
    }

    #[test]
    fn mask_union_and_overlap() {
        let a = Mask::from_fn(|p| p.col == 0);
        let b = Mask::from_fn(|p| p.row == 0);
        assert!(a.overlaps(&b));
        assert_eq!(a.union(&b).count(), ROWS + COLS - 1);
        assert_eq!(a.positions().next(), Some(WellPos::new(0, 0)));
    }
}
