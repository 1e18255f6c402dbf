//! Command-line parsing for the QARTOD threshold generator.
//!
//! Argument parsing and command dispatch stay separate from the estimators;
//! `app` maps these structs onto [`crate::domain::RunConfig`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{InstrumentKind, PlatformArg};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "qartod", version, about = "QARTOD gross range and climatology test limits")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build annotations, gross range and climatology lookup tables for one sensor.
    Generate(GenerateArgs),
    /// Print the depth bins used for an instrument/platform pair.
    Bins(BinsArgs),
    /// Write a synthetic sample CSV in the `generate --input` layout.
    Synth(SynthArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct GenerateArgs {
    /// Site code, e.g. CE02SHBP.
    #[arg(long)]
    pub site: String,

    /// Node code, e.g. LJ01D.
    #[arg(long)]
    pub node: String,

    /// Sensor code, e.g. 10-PHSEND103.
    #[arg(long)]
    pub sensor: String,

    #[arg(short = 'i', long, value_enum)]
    pub instrument: InstrumentKind,

    #[arg(short = 'p', long, value_enum, default_value_t = PlatformArg::Fixed)]
    pub platform: PlatformArg,

    /// Sample CSV: `time`, optional depth column, one column per parameter.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Historical annotation CSV.
    #[arg(long, value_name = "CSV")]
    pub annotations: Option<PathBuf>,

    /// Ignore data collected after this instant (RFC3339 or YYYY-MM-DD).
    #[arg(long)]
    pub cut_off: Option<String>,

    /// Ignore data collected before this instant.
    #[arg(long, default_value = "2014-01-01")]
    pub start: String,

    #[arg(short = 'o', long, env = "QARTOD_OUTPUT_DIR", default_value = "qartod_output")]
    pub output_dir: PathBuf,

    /// Standard-deviation multiplier for user bounds and climatology bands.
    #[arg(long, default_value_t = 3.0)]
    pub sigma: f64,

    /// Harmonic order of the seasonal cycle.
    #[arg(long, default_value_t = 2)]
    pub harmonics: usize,

    /// Median resampling window for fixed platforms (0 disables).
    #[arg(long, default_value_t = 180)]
    pub resample_minutes: u32,

    /// Override the instrument's gap threshold (samples).
    #[arg(long)]
    pub max_gap: Option<usize>,

    /// Override the instrument's minimum block length (samples).
    #[arg(long)]
    pub min_duration: Option<usize>,

    /// Evaluate every n-th sample when finding blocks.
    #[arg(long)]
    pub stride: Option<usize>,

    /// Decimal places in the climatology table files.
    #[arg(long, default_value_t = 2)]
    pub decimals: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct BinsArgs {
    #[arg(short = 'i', long, value_enum)]
    pub instrument: InstrumentKind,

    #[arg(short = 'p', long, value_enum)]
    pub platform: PlatformArg,
}

#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    #[arg(short = 'i', long, value_enum)]
    pub instrument: InstrumentKind,

    #[arg(short = 'p', long, value_enum, default_value_t = PlatformArg::Fixed)]
    pub platform: PlatformArg,

    /// First sample time.
    #[arg(long, default_value = "2018-01-01")]
    pub start: String,

    #[arg(long, default_value_t = 730)]
    pub days: u32,

    /// Minutes between samples.
    #[arg(long, default_value_t = 60)]
    pub step: u32,

    /// Injected failure runs per parameter.
    #[arg(long, default_value_t = 3)]
    pub fail_runs: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}
