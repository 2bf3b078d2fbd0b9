//! Plot rendering.
//!
//! - terminal ASCII plot of one group's standard curve (`ascii`)
//! - SVG fit charts, prediction bar charts and plate maps (`charts`)

pub mod ascii;
pub mod charts;

pub use ascii::*;
pub use charts::*;
