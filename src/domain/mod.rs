//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - QC primitives (`QcFlag`, `FailureBlock`, `Annotation`)
//! - estimator outputs (`GrossRangeSpec`, `ClimatologyTable`, etc.)
//! - instrument/platform variants selected at the CLI boundary

pub mod instrument;
pub mod types;

pub use instrument::*;
pub use types::*;
