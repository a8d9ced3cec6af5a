//! Mathematical utilities: the linear solves behind the nonlinear fitter.

pub mod lstsq;

pub use lstsq::*;
