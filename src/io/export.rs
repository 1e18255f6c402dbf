//! Write lookup records, climatology tables and sample series to disk.
//!
//! Output layout for one reference designator:
//!
//! ```text
//! {out}/{SITE-NODE-SENSOR}.quality_annotations.csv
//! {out}/{SITE-NODE-SENSOR}.gross_range.csv
//! {out}/{SITE-NODE-SENSOR}.climatology.csv
//! {out}/climatology_tables/{SITE-NODE-SENSOR}-{parameter}.csv
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::data::Dataset;
use crate::domain::{InstrumentKind, ReferenceDesignator};
use crate::error::AppError;
use crate::report::lookup::TABLE_DIR;

/// Resolved output file locations.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub annotations: PathBuf,
    pub gross_range: PathBuf,
    pub climatology: PathBuf,
    pub table_dir: PathBuf,
}

impl OutputPaths {
    pub fn new(output_dir: &Path, designator: &ReferenceDesignator) -> Self {
        let stem = designator.stem();
        Self {
            annotations: output_dir.join(format!("{stem}.quality_annotations.csv")),
            gross_range: output_dir.join(format!("{stem}.gross_range.csv")),
            climatology: output_dir.join(format!("{stem}.climatology.csv")),
            table_dir: output_dir.join(TABLE_DIR),
        }
    }

    /// Create the output and table directories.
    pub fn prepare(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.table_dir).map_err(|e| {
            AppError::new(
                2,
                format!("Failed to create output directory '{}': {e}", self.table_dir.display()),
            )
        })
    }
}

/// Write serialisable records as CSV, header taken from the record fields.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row to '{}': {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))
}

pub fn write_text(path: &Path, text: &str) -> Result<(), AppError> {
    fs::write(path, text).map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))
}

/// Write a dataset in the layout read by `io::ingest::load_samples`.
pub fn write_samples(path: &Path, dataset: &Dataset, instrument: InstrumentKind) -> Result<(), AppError> {
    let err = |e: csv::Error| AppError::new(2, format!("Failed to write samples '{}': {e}", path.display()));
    let mut writer = csv::Writer::from_path(path).map_err(err)?;

    let mut header = vec!["time".to_string()];
    if dataset.depth().is_some() {
        header.push(instrument.depth_parameter().to_string());
    }
    for s in dataset.series() {
        header.push(s.name.clone());
        if s.flags.is_some() {
            header.push(format!("{}_qc_flag", s.name));
        }
    }
    writer.write_record(&header).map_err(err)?;

    for (i, t) in dataset.times().iter().enumerate() {
        let mut row = vec![t.format("%Y-%m-%dT%H:%M:%SZ").to_string()];
        if let Some(depth) = dataset.depth() {
            row.push(fmt_value(depth[i]));
        }
        for s in dataset.series() {
            row.push(fmt_value(s.values[i]));
            if let Some(flags) = &s.flags {
                row.push(flags[i].code().to_string());
            }
        }
        writer.write_record(&row).map_err(err)?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush samples '{}': {e}", path.display())))
}

fn fmt_value(v: f64) -> String {
    if v.is_finite() { format!("{v:.6}") } else { String::new() }
}
