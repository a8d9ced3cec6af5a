//! Formatted terminal output: session summaries, batch reports, ingest
//! warnings.

pub mod format;

pub use format::*;
