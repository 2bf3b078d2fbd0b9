//! Reporting utilities: flag tallies and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{Highlight, ResultGrid};

/// How many wells of a plate carry each highlight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagCounts {
    pub missing: usize,
    pub invalid: usize,
    pub extrapolated: usize,
    pub zero: usize,
    pub control: usize,
}

impl FlagCounts {
    /// Tally the resolved highlight of every well.
    pub fn from_result(result: &ResultGrid) -> Self {
        let mut counts = Self::default();
        for (_, flags) in result.flags.iter() {
            match flags.highlight() {
                Some(Highlight::Missing) => counts.missing += 1,
                Some(Highlight::Invalid) => counts.invalid += 1,
                Some(Highlight::Extrapolated) => counts.extrapolated += 1,
                Some(Highlight::Zero) => counts.zero += 1,
                Some(Highlight::Control) => counts.control += 1,
                None => {}
            }
        }
        counts
    }

    pub fn add(&mut self, other: &FlagCounts) {
        self.missing += other.missing;
        self.invalid += other.invalid;
        self.extrapolated += other.extrapolated;
        self.zero += other.zero;
        self.control += other.control;
    }
}
