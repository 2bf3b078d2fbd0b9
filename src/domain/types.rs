//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - used in-memory during classification, fitting, and assembly
//! - exported to CSV/JSON/SVG
//! - reloaded later for reporting

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::grid::{Grid, Mask, WellPos};

/// Marker character for control wells in the template.
pub const CONTROL_MARKER: char = 'C';
/// Marker character for experimental wells in the template.
pub const EXPERIMENTAL_MARKER: char = 'E';

/// A parsed template cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WellLabel {
    /// Bare `C`.
    PlainControl,
    /// Bare `E`.
    PlainExperimental,
    /// `C<n>`, `n >= 1`.
    GroupedControl(u32),
    /// `E<n>`, `n >= 1`.
    GroupedExperimental(u32),
    /// Blank cell: the well is unused and belongs to no group.
    Empty,
    /// Anything else (kept verbatim for error messages).
    Unrecognized(String),
}

impl fmt::Display for WellLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WellLabel::PlainControl => write!(f, "{CONTROL_MARKER}"),
            WellLabel::PlainExperimental => write!(f, "{EXPERIMENTAL_MARKER}"),
            WellLabel::GroupedControl(n) => write!(f, "{CONTROL_MARKER}{n}"),
            WellLabel::GroupedExperimental(n) => write!(f, "{EXPERIMENTAL_MARKER}{n}"),
            WellLabel::Empty => Ok(()),
            WellLabel::Unrecognized(raw) => write!(f, "{raw}"),
        }
    }
}

/// Identifies which calibration curve a set of wells belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    /// The single curve of an ungrouped template.
    All,
    /// Group `n` of a grouped template.
    Index(u32),
}

impl GroupKey {
    pub fn index(self) -> Option<u32> {
        match self {
            GroupKey::All => None,
            GroupKey::Index(n) => Some(n),
        }
    }

    /// Suffix used in chart file names and titles (`""` or `" group 2"`).
    pub fn suffix(self) -> String {
        match self {
            GroupKey::All => String::new(),
            GroupKey::Index(n) => format!(" group {n}"),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::All => write!(f, "all wells"),
            GroupKey::Index(n) => write!(f, "group {n}"),
        }
    }
}

/// Paired control/experimental selection sharing one fitted curve.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMasks {
    pub control: Mask,
    pub experimental: Mask,
}

/// Classifier output.
///
/// Downstream code branches on this tag (or iterates `groups()`), never on
/// ad hoc label counts.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Ungrouped { masks: GroupMasks },
    Grouped { groups: BTreeMap<u32, GroupMasks> },
}

impl Classification {
    pub fn is_grouped(&self) -> bool {
        matches!(self, Classification::Grouped { .. })
    }

    /// Groups in index order (a single `GroupKey::All` entry when ungrouped).
    pub fn groups(&self) -> Vec<(GroupKey, &GroupMasks)> {
        match self {
            Classification::Ungrouped { masks } => vec![(GroupKey::All, masks)],
            Classification::Grouped { groups } => groups
                .iter()
                .map(|(&n, masks)| (GroupKey::Index(n), masks))
                .collect(),
        }
    }

    /// Union of all control masks.
    pub fn control_mask(&self) -> Mask {
        self.groups()
            .iter()
            .fold(Mask::empty(), |acc, (_, m)| acc.union(&m.control))
    }

    /// Union of all experimental masks.
    pub fn experimental_mask(&self) -> Mask {
        self.groups()
            .iter()
            .fold(Mask::empty(), |acc, (_, m)| acc.union(&m.experimental))
    }
}

/// Template + reference concentrations, loaded once per run and immutable thereafter.
#[derive(Debug, Clone)]
pub struct PlateLayout {
    pub labels: Grid<WellLabel>,
    pub classification: Classification,
    /// Known concentrations (ug/ml); only meaningful at control wells.
    pub concentrations: Grid<Option<f64>>,
}

/// One plate block read from a data file.
#[derive(Debug, Clone)]
pub struct Plate {
    pub name: String,
    /// Raw optical-density measurements; `None` where the cell was empty or unreadable.
    pub signals: Grid<Option<f64>>,
}

/// Parameters of `y = amplitude / (1 + exp(-steepness * (x - inflection))) + baseline`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    pub inflection: f64,
    pub baseline: f64,
    pub amplitude: f64,
    pub steepness: f64,
}

impl FitParams {
    pub const NAN: FitParams = FitParams {
        inflection: f64::NAN,
        baseline: f64::NAN,
        amplitude: f64::NAN,
        steepness: f64::NAN,
    };

    pub fn to_array(self) -> [f64; 4] {
        [self.inflection, self.baseline, self.amplitude, self.steepness]
    }

    /// # Panics
    /// Panics if `values` has fewer than 4 elements.
    pub fn from_slice(values: &[f64]) -> Self {
        Self {
            inflection: values[0],
            baseline: values[1],
            amplitude: values[2],
            steepness: values[3],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Solver outcome, reported for diagnostics only.
///
/// The success variants mirror the classic MINPACK convergence codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    /// Sum of squares reached exactly zero.
    ExactFit,
    /// Relative reduction in the sum of squares fell below tolerance.
    ResidualTolerance,
    /// Relative step size fell below tolerance.
    StepTolerance,
    /// Both of the above on the same step.
    ResidualAndStepTolerance,
    /// Evaluation budget exhausted before convergence.
    MaxEvaluations,
    /// No usable points, or the start/objective was non-finite.
    Degenerate,
}

impl FitStatus {
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            FitStatus::ExactFit
                | FitStatus::ResidualTolerance
                | FitStatus::StepTolerance
                | FitStatus::ResidualAndStepTolerance
        )
    }

    pub fn describe(self) -> &'static str {
        match self {
            FitStatus::ExactFit => "exact fit",
            FitStatus::ResidualTolerance => "converged (residual)",
            FitStatus::StepTolerance => "converged (step)",
            FitStatus::ResidualAndStepTolerance => "converged (residual+step)",
            FitStatus::MaxEvaluations => "evaluation budget exhausted",
            FitStatus::Degenerate => "degenerate",
        }
    }
}

/// One control well used for fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub well: WellPos,
    /// `log10(known concentration)`.
    pub log_concentration: f64,
    pub signal: f64,
}

/// Log10 concentration span of a group's control points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRange {
    pub min_log10: f64,
    pub max_log10: f64,
}

impl ControlRange {
    pub const EMPTY: ControlRange = ControlRange {
        min_log10: f64::NAN,
        max_log10: f64::NAN,
    };

    pub fn from_points(points: &[ControlPoint]) -> Self {
        if points.is_empty() {
            return Self::EMPTY;
        }
        let mut min_log10 = f64::INFINITY;
        let mut max_log10 = f64::NEG_INFINITY;
        for p in points {
            min_log10 = min_log10.min(p.log_concentration);
            max_log10 = max_log10.max(p.log_concentration);
        }
        Self { min_log10, max_log10 }
    }

    pub fn is_empty(&self) -> bool {
        !(self.min_log10.is_finite() && self.max_log10.is_finite())
    }

    pub fn min_concentration(&self) -> f64 {
        10f64.powf(self.min_log10)
    }

    pub fn max_concentration(&self) -> f64 {
        10f64.powf(self.max_log10)
    }
}

/// Fit result for one (plate, group) pair.
#[derive(Debug, Clone)]
pub struct GroupFit {
    pub key: GroupKey,
    pub params: FitParams,
    pub status: FitStatus,
    pub sse: f64,
    pub rmse: f64,
    pub evaluations: usize,
    pub points: Vec<ControlPoint>,
    pub range: ControlRange,
}

/// Colour-coded annotation for one result cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Highlight {
    Missing,
    Invalid,
    Extrapolated,
    Zero,
    Control,
}

impl Highlight {
    pub fn label(self) -> &'static str {
        match self {
            Highlight::Missing => "missing",
            Highlight::Invalid => "invalid",
            Highlight::Extrapolated => "extrapolated",
            Highlight::Zero => "zero",
            Highlight::Control => "control",
        }
    }

    /// Fill colour as `(r, g, b)`.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Highlight::Missing => (0xFF, 0x00, 0x00),
            Highlight::Invalid => (0xB0, 0x6C, 0xE0),
            Highlight::Extrapolated => (0xFF, 0xA5, 0x00),
            Highlight::Zero => (0xFF, 0xFF, 0x00),
            Highlight::Control => (0x90, 0xEE, 0x90),
        }
    }
}

/// Independent per-well flags; `highlight()` resolves them for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WellFlags {
    pub is_control: bool,
    /// Experimental well with no measurement.
    pub missing_signal: bool,
    /// Experimental well whose predicted log-concentration is non-finite.
    pub invalid_prediction: bool,
    /// Experimental well predicted outside its group's control range.
    pub extrapolated: bool,
    /// Final (rounded) value is exactly zero.
    pub zero_value: bool,
}

impl WellFlags {
    /// Highlight after applying fills in order missing → invalid →
    /// extrapolated → zero → control; later fills override earlier ones.
    pub fn highlight(&self) -> Option<Highlight> {
        let mut fill = None;
        if self.missing_signal {
            fill = Some(Highlight::Missing);
        }
        if self.invalid_prediction {
            fill = Some(Highlight::Invalid);
        }
        if self.extrapolated {
            fill = Some(Highlight::Extrapolated);
        }
        if self.zero_value {
            fill = Some(Highlight::Zero);
        }
        if self.is_control {
            fill = Some(Highlight::Control);
        }
        fill
    }
}

/// Final per-plate output: rounded values plus parallel flags.
#[derive(Debug, Clone)]
pub struct ResultGrid {
    pub values: Grid<f64>,
    pub flags: Grid<WellFlags>,
}

#[derive(Debug, Clone)]
pub struct PlateResult {
    pub name: String,
    pub fits: Vec<GroupFit>,
    pub result: ResultGrid,
}

/// All plates of one data file (one output "sheet").
#[derive(Debug, Clone)]
pub struct FileResult {
    pub name: String,
    pub plates: Vec<PlateResult>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults and environment).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_dir: PathBuf,
    pub template_path: PathBuf,
    pub concentrations_path: PathBuf,
    pub output_dir: PathBuf,
    /// Substring identifying a plate block's first cell.
    pub plate_marker: String,
    pub max_evaluations: usize,
    pub charts: bool,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    /// Compute and print, but write nothing.
    pub dry_run: bool,
}

/// Settings for `plate simulate`.
#[derive(Debug, Clone)]
pub struct SimulateConfig {
    pub output_dir: PathBuf,
    pub files: usize,
    pub plates: usize,
    /// `1` writes an ungrouped template; `2..=4` a grouped one.
    pub groups: u32,
    pub seed: u64,
    /// Standard deviation of additive signal noise.
    pub noise: f64,
    /// Probability that an experimental well is left blank.
    pub missing: f64,
}
