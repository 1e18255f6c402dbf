//! Input/output helpers.
//!
//! - sample CSV ingest + validation (`ingest`)
//! - historical annotation ingest (`annotations`)
//! - climatology table text (`table`)
//! - record and sample exports (`export`)

pub mod annotations;
pub mod export;
pub mod ingest;
pub mod table;

pub use annotations::*;
pub use export::*;
pub use ingest::*;
pub use table::*;
