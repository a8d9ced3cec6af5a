//! Data generation helpers.
//!
//! Real workflows ingest pattern tables from disk; this module provides the
//! deterministic synthetic counterpart used by the demo command and the
//! recovery tests.

pub mod synthetic;

pub use synthetic::*;
