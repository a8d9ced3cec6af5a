//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input configuration enums (`CakeDirection`, `Delimiter`)
//! - the loaded pattern and its borrowed windows (`DiffractionPattern`, `SpectrumSlice`)
//! - validated peak declarations (`PeakSpec`)
//! - fit outputs (`FitOutcome`, `MaximumFit`, `FitQuality`)

pub mod types;

pub use types::*;
