//! Input/output collaborators.
//!
//! - plate-reader export discovery + ingest (`ingest`)
//! - template and reference-concentration loading (`template`)
//! - result / flag sheets and simulated inputs (`export`)
//! - JSON run report read/write (`json`)

pub mod export;
pub mod ingest;
pub mod json;
pub mod template;

pub use export::*;
pub use ingest::*;
pub use json::*;
pub use template::*;
