//! Seasonal model implementations.
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic.

pub mod harmonic;

pub use harmonic::*;
