//! Well classification: template labels → control/experimental group masks.
//!
//! Responsibilities:
//!
//! - parse raw template cells into `WellLabel`s (strict, no silent defaults;
//!   blank cells are unused wells and join no group)
//! - decide between the ungrouped (`C`/`E`) and grouped (`C1`/`E1`, ...) layouts
//! - validate that control and experimental groups pair up one-to-one
//!
//! Every failure here is an authoring mistake in the template, so it is
//! reported as a `ClassifyError` and aborts the run.

pub mod label;

use std::collections::BTreeSet;
use std::fmt;

use crate::domain::{Classification, Grid, GroupMasks, Mask, WellLabel, WellPos};
use crate::error::AppError;

pub use label::parse_label;

/// Which side of a group pairing a problem was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Control,
    Experimental,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Control => write!(f, "control"),
            Side::Experimental => write!(f, "experimental"),
        }
    }
}

/// Template configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    UnrecognizedLabel { well: WellPos, label: String },
    /// Bare and grouped labels in the same template.
    MixedLabelling,
    NoControlWells,
    /// Groups present on one side but not the other.
    OneSidedGroups { control: usize, experimental: usize },
    GroupCountMismatch { control: usize, experimental: usize },
    MaxIndexMismatch { control: u32, experimental: u32 },
    /// Index range `1..=max` has a hole.
    EmptyGroup { index: u32, side: Side },
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyError::UnrecognizedLabel { well, label } => write!(
                f,
                "Unrecognized template label '{label}' at well {well} (expected C, E, C<n> or E<n>)."
            ),
            ClassifyError::MixedLabelling => write!(
                f,
                "Template mixes bare (C/E) and grouped (C<n>/E<n>) labels."
            ),
            ClassifyError::NoControlWells => write!(f, "Template defines no control wells."),
            ClassifyError::OneSidedGroups {
                control,
                experimental,
            } => write!(
                f,
                "Groups present on one side but not the other: {control} control group(s), {experimental} experimental group(s)."
            ),
            ClassifyError::GroupCountMismatch {
                control,
                experimental,
            } => write!(
                f,
                "Unequal group counts: {control} control group(s) vs {experimental} experimental group(s)."
            ),
            ClassifyError::MaxIndexMismatch {
                control,
                experimental,
            } => write!(
                f,
                "Mismatched maximum group index: control C{control} vs experimental E{experimental}."
            ),
            ClassifyError::EmptyGroup { index, side } => write!(
                f,
                "Group indices must be contiguous from 1: {side} group {index} has no wells."
            ),
        }
    }
}

impl std::error::Error for ClassifyError {}

impl From<ClassifyError> for AppError {
    fn from(err: ClassifyError) -> Self {
        AppError::config(format!("Template error: {err}"))
    }
}

/// Parse every cell of a raw template grid.
pub fn parse_template(raw: &Grid<String>) -> Grid<WellLabel> {
    raw.map(|cell| parse_label(cell))
}

/// Classify a parsed template.
///
/// Mode selection: if no cell carries a bare control marker the template is
/// treated as grouped, otherwise as ungrouped. Groups are then validated once.
pub fn classify(template: &Grid<WellLabel>) -> Result<Classification, ClassifyError> {
    if let Some((well, WellLabel::Unrecognized(label))) = template
        .iter()
        .find(|(_, l)| matches!(l, WellLabel::Unrecognized(_)))
    {
        return Err(ClassifyError::UnrecognizedLabel {
            well,
            label: label.clone(),
        });
    }

    let plain_control = count(template, |l| *l == WellLabel::PlainControl);
    let plain_experimental = count(template, |l| *l == WellLabel::PlainExperimental);
    let grouped = count(template, |l| {
        matches!(
            l,
            WellLabel::GroupedControl(_) | WellLabel::GroupedExperimental(_)
        )
    });

    if plain_control > 0 {
        if grouped > 0 {
            return Err(ClassifyError::MixedLabelling);
        }
        let masks = GroupMasks {
            control: mask_where(template, |l| *l == WellLabel::PlainControl),
            experimental: mask_where(template, |l| *l == WellLabel::PlainExperimental),
        };
        return Ok(Classification::Ungrouped { masks });
    }

    if grouped == 0 {
        return Err(ClassifyError::NoControlWells);
    }
    if plain_experimental > 0 {
        return Err(ClassifyError::MixedLabelling);
    }

    let mut control_indices = BTreeSet::new();
    let mut experimental_indices = BTreeSet::new();
    for (_, label) in template.iter() {
        match label {
            WellLabel::GroupedControl(n) => {
                control_indices.insert(*n);
            }
            WellLabel::GroupedExperimental(n) => {
                experimental_indices.insert(*n);
            }
            _ => {}
        }
    }

    validate_groups(&control_indices, &experimental_indices)?;

    let groups = control_indices
        .iter()
        .map(|&n| {
            let masks = GroupMasks {
                control: mask_where(template, |l| *l == WellLabel::GroupedControl(n)),
                experimental: mask_where(template, |l| *l == WellLabel::GroupedExperimental(n)),
            };
            (n, masks)
        })
        .collect();

    Ok(Classification::Grouped { groups })
}

/// Check that control and experimental group indices pair up as `1..=max` on both sides.
pub fn validate_groups(
    control: &BTreeSet<u32>,
    experimental: &BTreeSet<u32>,
) -> Result<(), ClassifyError> {
    if control.is_empty() != experimental.is_empty() {
        return Err(ClassifyError::OneSidedGroups {
            control: control.len(),
            experimental: experimental.len(),
        });
    }
    if control.len() != experimental.len() {
        return Err(ClassifyError::GroupCountMismatch {
            control: control.len(),
            experimental: experimental.len(),
        });
    }

    let control_max = control.iter().next_back().copied().unwrap_or(0);
    let experimental_max = experimental.iter().next_back().copied().unwrap_or(0);
    if control_max != experimental_max {
        return Err(ClassifyError::MaxIndexMismatch {
            control: control_max,
            experimental: experimental_max,
        });
    }

    for (side, indices) in [(Side::Control, control), (Side::Experimental, experimental)] {
        if let Some(index) = (1..=control_max).find(|i| !indices.contains(i)) {
            return Err(ClassifyError::EmptyGroup { index, side });
        }
    }

    Ok(())
}

fn count(template: &Grid<WellLabel>, pred: impl Fn(&WellLabel) -> bool) -> usize {
    template.iter().filter(|(_, l)| pred(*l)).count()
}

fn mask_where(template: &Grid<WellLabel>, pred: impl Fn(&WellLabel) -> bool) -> Mask {
    template.map(|l| pred(l))
}
