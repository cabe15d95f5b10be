//! Trait matrices (spec §4.2).

pub mod bounds;
pub mod continuous;
pub mod discrete;
pub mod stateset;

pub use bounds::{Bounds, BoundsPolicy};
pub use continuous::ContinuousMatrix;
pub use discrete::DiscreteMatrix;
pub use stateset::StateSet;
