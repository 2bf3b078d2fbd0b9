//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fixed 8×12 plate geometry (`Grid`, `WellPos`, `Mask`)
//! - template labels and the classifier output (`WellLabel`, `Classification`)
//! - fit outputs (`FitParams`, `FitStatus`, `GroupFit`)
//! - assembled results (`ResultGrid`, `WellFlags`, `PlateResult`)
//! - run configuration derived from CLI flags

pub mod grid;
pub mod types;

pub use grid::*;
pub use types::*;
