//! Mathematical utilities: least squares (linear and Levenberg–Marquardt) and
//! small statistics helpers.

pub mod lm;
pub mod ols;
pub mod stats;

pub use lm::*;
pub use ols::*;
pub use stats::*;
