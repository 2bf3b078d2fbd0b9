//! Dose-response model implementations.
//!
//! Models are implemented as small, pure functions so that fitting and
//! prediction code can stay simple.

pub mod model;

pub use model::*;
