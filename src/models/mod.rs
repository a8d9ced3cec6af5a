//! Peak-shape model implementations.
//!
//! Shapes are implemented as small, pure functions so that fitting code can
//! stay generic; the composite wraps them into one flat-parameter model per
//! peak window.

pub mod composite;
pub mod shape;

pub use composite::*;
pub use shape::*;
