//! Top-level application orchestration.
//!
//! `src/main.rs` only sets up logging; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - maps arguments onto a [`RunConfig`]
//! - runs the pipeline and prints the summary

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::info;

use crate::cli::{BinsArgs, Command, GenerateArgs, SynthArgs};
use crate::data::{SynthConfig, generate_series};
use crate::domain::{BlockParams, EstimatorConfig, Platform, ReferenceDesignator, RunConfig};
use crate::error::AppError;
use crate::io::ingest::parse_timestamp;

pub mod pipeline;

/// Entry point for the `qartod` binary.
pub fn run() -> Result<(), AppError> {
    // Missing `.env` is fine; flags and the real environment still apply.
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Generate(args) => handle_generate(args),
        Command::Bins(args) => handle_bins(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let run = pipeline::run_generate(&config)?;
    println!("{}", crate::report::format_run_summary(&run, &config));
    Ok(())
}

fn handle_bins(args: BinsArgs) -> Result<(), AppError> {
    let platform = Platform::from(args.platform);
    match crate::fit::depth_bins_for(args.instrument, platform) {
        Some(bins) => print!("{}", crate::report::format_bins(&bins)),
        None => println!("{} on {platform:?} is not depth binned", args.instrument.display_name()),
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = synth_config_from_args(&args)?;
    let dataset = generate_series(&config)?;
    crate::io::export::write_samples(&args.out, &dataset, config.instrument)?;
    info!(rows = dataset.len(), path = %args.out.display(), "wrote synthetic samples");
    Ok(())
}

pub fn run_config_from_args(args: &GenerateArgs) -> Result<RunConfig, AppError> {
    let cut_off = args.cut_off.as_deref().map(|s| parse_time_arg("--cut-off", s)).transpose()?;
    let start = parse_time_arg("--start", &args.start)?;

    if !(args.sigma.is_finite() && args.sigma > 0.0) {
        return Err(AppError::new(2, format!("--sigma must be positive, got {}", args.sigma)));
    }
    if args.harmonics == 0 {
        return Err(AppError::new(2, "--harmonics must be at least 1"));
    }

    Ok(RunConfig {
        designator: ReferenceDesignator::new(&args.site, &args.node, &args.sensor),
        instrument: args.instrument,
        platform: args.platform.into(),
        input_path: args.input.clone(),
        annotations_path: args.annotations.clone(),
        output_dir: args.output_dir.clone(),
        cut_off,
        start,
        resample_minutes: args.resample_minutes,
        estimator: EstimatorConfig {
            sigma_multiplier: args.sigma,
            harmonics: args.harmonics,
        },
        block_override: block_override_from_args(args),
        table_decimals: args.decimals,
    })
}

/// Any block flag replaces the instrument defaults; unset ones fall back to [`BlockParams::default`].
fn block_override_from_args(args: &GenerateArgs) -> Option<BlockParams> {
    if args.max_gap.is_none() && args.min_duration.is_none() && args.stride.is_none() {
        return None;
    }
    let base = BlockParams::default();
    Some(
        BlockParams::new(
            args.max_gap.unwrap_or(base.max_gap),
            args.min_duration.unwrap_or(base.min_duration),
        )
        .with_stride(args.stride.unwrap_or(base.stride).max(1)),
    )
}

pub fn synth_config_from_args(args: &SynthArgs) -> Result<SynthConfig, AppError> {
    if args.step == 0 {
        return Err(AppError::new(2, "--step must be at least 1 minute"));
    }
    Ok(SynthConfig {
        instrument: args.instrument,
        platform: args.platform.into(),
        start: parse_time_arg("--start", &args.start)?,
        days: args.days,
        step_minutes: args.step,
        fail_runs: args.fail_runs,
        seed: args.seed,
    })
}

fn parse_time_arg(flag: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    parse_timestamp(value).map_err(|e| AppError::new(2, format!("Invalid {flag} '{value}': {e}")))
}
