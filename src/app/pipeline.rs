//! The threshold-generation pipeline behind `qartod generate`.
//!
//! ingest -> failure blocks -> HITL annotations -> merge with historical ->
//! per-parameter exclusion -> time window -> resample (fixed platforms) ->
//! gross range + climatology -> lookup records -> files
//!
//! Each stage returns a new `Dataset`; nothing is mutated in place.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::data::Dataset;
use crate::domain::{Annotation, ClimatologyTable, GrossRangeSpec, Platform, QcFlag, RunConfig};
use crate::error::{AppError, QcError};
use crate::fit::{depth_bins_for, process_climatology, process_gross_range};
use crate::io::{OutputPaths, format_table, load_annotations, load_samples, write_records, write_text};
use crate::qc::{create_annotations, exclusion_mask, for_designator, identify_blocks, merge_annotations, rollup_flags};
use crate::report::lookup::{
    LookupContext, annotation_record, climatology_record, gross_range_record, table_file_name,
};

/// What happened to one parameter.
#[derive(Debug, Clone)]
pub struct ParameterOutcome {
    pub name: String,
    pub blocks: usize,
    pub excluded: usize,
    /// Finite values left after exclusion, windowing and resampling.
    pub usable: usize,
    pub gross_range: Result<GrossRangeSpec, QcError>,
    pub climatology: Result<ClimatologyTable, QcError>,
}

/// All computed outputs of a single `qartod generate` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub rows_read: usize,
    pub rows_used: usize,
    pub historical: usize,
    pub rejected_annotations: usize,
    pub generated: usize,
    pub window: (DateTime<Utc>, DateTime<Utc>),
    pub samples: usize,
    pub resampled: bool,
    pub parameters: Vec<ParameterOutcome>,
    pub paths: OutputPaths,
}

/// Execute the full pipeline and write every output file.
pub fn run_generate(config: &RunConfig) -> Result<RunOutput, AppError> {
    // 1) Load samples and historical annotations.
    let ingest = load_samples(&config.input_path, config.instrument)?;
    info!(
        rows = ingest.rows_used,
        skipped = ingest.row_errors.len(),
        "loaded {}",
        config.input_path.display()
    );

    let (historical, rejected_annotations) = match &config.annotations_path {
        Some(path) => {
            let loaded = load_annotations(path)?;
            let rejected = loaded.rejected.len();
            (for_designator(loaded.annotations, &config.designator), rejected)
        }
        None => (Vec::new(), 0),
    };
    let historical_count = historical.len();

    // 2) Failure blocks -> HITL annotations, merged with the historical set.
    let (generated, block_counts) = generate_annotations(config, &ingest.dataset)?;
    let generated_count = generated.len();
    let annotations = merge_annotations(historical, generated);
    info!(
        historical = historical_count,
        generated = generated_count,
        "annotations merged"
    );

    // 3) Exclude failing samples, one parameter at a time.
    let (cleaned, excluded) = apply_exclusions(config, ingest.dataset, &annotations)?;

    // 4) Time window and resampling.
    let end = config
        .cut_off
        .or(cleaned.last_time())
        .ok_or_else(|| AppError::new(3, "No samples to process."))?;
    let windowed = cleaned.window(config.start, end);
    let resampled = config.platform == Platform::Fixed && config.resample_minutes > 0;
    let prepared = if resampled {
        windowed.resample_median(config.resample_minutes)?
    } else {
        windowed
    };
    if prepared.is_empty() {
        return Err(AppError::new(
            3,
            format!("No samples between {} and {}.", config.start, end),
        ));
    }
    info!(samples = prepared.len(), resampled, "series prepared");

    // 5) Estimators.
    let bins = depth_bins_for(config.instrument, config.platform);
    let mut outcomes = Vec::new();
    for (i, param) in config.instrument.parameters().iter().enumerate() {
        let series = prepared
            .parameter(param.name)
            .ok_or_else(|| AppError::new(2, format!("Parameter {} missing after preparation.", param.name)))?;
        let usable = series.values.iter().filter(|v| v.is_finite()).count();

        let gross_range = process_gross_range(&series.values, param.sensor_bounds, &config.estimator);
        let climatology = process_climatology(
            &series.values,
            prepared.times(),
            param.sensor_bounds,
            prepared.depth(),
            bins.as_deref(),
            &config.estimator,
        );
        for err in [gross_range.as_ref().err(), climatology.as_ref().err()].into_iter().flatten() {
            warn!(parameter = param.name, "{err}");
        }

        outcomes.push(ParameterOutcome {
            name: param.name.to_string(),
            blocks: block_counts[i],
            excluded: excluded[i],
            usable,
            gross_range,
            climatology,
        });
    }

    if outcomes.iter().all(|o| o.gross_range.is_err() && o.climatology.is_err()) {
        let first = outcomes
            .iter()
            .find_map(|o| o.gross_range.clone().err())
            .unwrap_or_else(|| QcError::insufficient_data("no parameters to process"));
        return Err(first.into());
    }

    // 6) Assemble and write the lookup records.
    let ctx = LookupContext {
        designator: &config.designator,
        instrument: config.instrument,
        through: end,
        estimator: &config.estimator,
    };
    let paths = OutputPaths::new(&config.output_dir, &config.designator);
    paths.prepare()?;

    let anno_records = annotations
        .iter()
        .map(annotation_record)
        .collect::<Result<Vec<_>, _>>()?;
    write_records(&paths.annotations, &anno_records)?;

    let mut gr_records = Vec::new();
    let mut clm_records = Vec::new();
    for (param, outcome) in config.instrument.parameters().iter().zip(&outcomes) {
        if let Ok(spec) = &outcome.gross_range {
            gr_records.push(gross_range_record(&ctx, param, spec)?);
        }
        if let Ok(table) = &outcome.climatology {
            clm_records.push(climatology_record(&ctx, param, table.is_binned())?);
            let path = paths.table_dir.join(table_file_name(&config.designator, param));
            write_text(&path, &format_table(table, config.table_decimals))?;
        }
    }
    write_records(&paths.gross_range, &gr_records)?;
    write_records(&paths.climatology, &clm_records)?;
    info!("lookup tables written to {}", config.output_dir.display());

    Ok(RunOutput {
        rows_read: ingest.rows_read,
        rows_used: ingest.rows_used,
        historical: historical_count,
        rejected_annotations,
        generated: generated_count,
        window: (config.start, end),
        samples: prepared.len(),
        resampled,
        parameters: outcomes,
        paths,
    })
}

/// HITL annotations for every parameter with raw flags and block settings.
///
/// Returns the annotations and the block count per parameter.
fn generate_annotations(config: &RunConfig, dataset: &Dataset) -> Result<(Vec<Annotation>, Vec<usize>), AppError> {
    let mut generated = Vec::new();
    let mut counts = Vec::new();

    for param in config.instrument.parameters() {
        let block_params = config.block_override.or(param.blocks);
        let flags = dataset.parameter(param.name).and_then(|s| s.flags.as_deref());
        let (Some(block_params), Some(flags)) = (block_params, flags) else {
            counts.push(0);
            continue;
        };

        let fail: Vec<bool> = flags.iter().map(|f| *f == QcFlag::Fail).collect();
        let blocks = identify_blocks(&fail, block_params)?;
        counts.push(blocks.len());
        generated.extend(create_annotations(
            &config.designator,
            &blocks,
            dataset.times(),
            param.annotation_ids,
        )?);
    }

    Ok((generated, counts))
}

/// NaN out samples whose raw flag or annotation roll-up is fail.
///
/// Returns the cleaned dataset and the excluded count per parameter.
fn apply_exclusions(
    config: &RunConfig,
    dataset: Dataset,
    annotations: &[Annotation],
) -> Result<(Dataset, Vec<usize>), AppError> {
    let mut cleaned = dataset;
    let mut excluded = Vec::new();

    for param in config.instrument.parameters() {
        let rollup = rollup_flags(annotations, cleaned.times(), param.annotation_ids);
        let raw = cleaned.parameter(param.name).and_then(|s| s.flags.as_deref());
        let mask = exclusion_mask(raw, &rollup);
        excluded.push(mask.iter().filter(|m| **m).count());
        cleaned = cleaned.exclude(param.name, &mask)?;
    }

    Ok((cleaned, excluded))
}
