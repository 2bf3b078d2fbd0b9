//! `plate-curves` library crate.
//!
//! Converts 96-well plate optical-density readings into analyte
//! concentrations through per-plate 4-parameter sigmoid standard curves.
//!
//! The binary (`plate`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the classifier, fitter, predictor and assembler can be driven directly
//!   by other callers with their own I/O
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod assemble;
pub mod classify;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod predict;
pub mod report;
