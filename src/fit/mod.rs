//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - select a group's usable control points
//! - fit the 4-parameter sigmoid by Levenberg–Marquardt
//! - report diagnostics and the group's control range

pub mod fitter;

pub use fitter::*;
