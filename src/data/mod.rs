//! Series containers and synthetic data.

pub mod dataset;
pub mod sample;

pub use dataset::*;
pub use sample::*;
