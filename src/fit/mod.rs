//! Peak fitting orchestration.
//!
//! Responsibilities:
//!
//! - seed initial parameters from bounds + raw samples
//! - refine each peak window with Levenberg–Marquardt (parallel per batch)
//! - compute derived quantities and keep outcomes addressable by maximum name

pub mod derived;
pub mod fitter;
pub mod guess;
pub mod session;
pub mod store;

pub use derived::*;
pub use fitter::*;
pub use guess::*;
pub use session::*;
pub use store::*;
