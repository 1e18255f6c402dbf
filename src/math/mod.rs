//! Mathematical utilities: seasonal basis, least squares and summary statistics.

pub mod basis;
pub mod ols;
pub mod stats;

pub use basis::*;
pub use ols::*;
pub use stats::*;
