//! Input/output helpers.
//!
//! - pattern table ingest + validation (`ingest`)
//! - peak spec JSON read/write (`peaks`)
//! - per-maximum CSV export (`export`)
//! - outcome JSON read/write (`outcomes`)

pub mod export;
pub mod ingest;
pub mod outcomes;
pub mod peaks;

pub use export::*;
pub use ingest::*;
pub use outcomes::*;
pub use peaks::*;
