//! Threshold estimation.
//!
//! Responsibilities:
//!
//! - static sensor and user bounds (`gross_range`)
//! - harmonic monthly climatology, optionally per depth bin (`climatology`)
//! - depth bin schemes per platform (`depth_bins`)

pub mod climatology;
pub mod depth_bins;
pub mod gross_range;

pub use climatology::*;
pub use depth_bins::*;
pub use gross_range::*;
