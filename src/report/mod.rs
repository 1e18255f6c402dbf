//! Reporting: lookup record assembly and terminal output.

pub mod format;
pub mod lookup;

pub use format::*;
pub use lookup::*;
