//! `qartod-limits` library crate.
//!
//! Derives QARTOD gross range and climatology test limits from historical
//! sensor records. The binary (`qartod`) is a thin wrapper around this
//! library so that:
//!
//! - the estimators are testable without spawning processes
//! - table assembly can be reused by other frontends

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod qc;
pub mod report;
