//! Failure detection and annotation handling.
//!
//! Responsibilities:
//!
//! - find runs of failing samples (`blocks`)
//! - turn them into annotations, merge with historical ones and roll up flags
//!   into a per-sample exclusion mask (`annotations`)

pub mod annotations;
pub mod blocks;

pub use annotations::*;
pub use blocks::*;
