//! Sample CSV ingest.
//!
//! Turns a cleaned sensor export into a [`Dataset`]:
//!
//! - `time` column (ISO-8601, naive timestamps are read as UTC)
//! - optional depth column named after the instrument's pressure variable
//! - one value column per instrument parameter (blank = missing, NaN)
//! - optional `{parameter}_qc_flag` columns holding 1/3/4 or flag labels
//!
//! Rows with an unreadable timestamp or flag are skipped and reported; the
//! remaining rows are sorted by time.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use csv::StringRecord;
use tracing::{debug, warn};

use crate::data::{Dataset, ParameterSeries};
use crate::domain::{InstrumentKind, QcFlag};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: dataset + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: Dataset,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

struct Row {
    time: DateTime<Utc>,
    depth: Option<f64>,
    values: Vec<f64>,
    flags: Vec<Option<QcFlag>>,
}

/// Load the samples of every parameter of `instrument` from `path`.
pub fn load_samples(path: &Path, instrument: InstrumentKind) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    if !header_map.contains_key("time") {
        return Err(AppError::new(2, "Missing required column: `time`"));
    }
    let params = instrument.parameters();
    for p in params {
        if !header_map.contains_key(p.name) {
            return Err(AppError::new(
                2,
                format!("Missing value column `{}` for {}", p.name, instrument.display_name()),
            ));
        }
    }
    let depth_column = instrument.depth_parameter();
    let has_depth = header_map.contains_key(depth_column);
    let flag_columns: Vec<String> = params.iter().map(|p| p.flag_column()).collect();
    let has_flags: Vec<bool> = flag_columns.iter().map(|c| header_map.contains_key(c.as_str())).collect();

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Line 1 is the header.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let parsed = parse_row(&record, &header_map, instrument, has_depth, &flag_columns, &has_flags);
        match parsed {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for e in row_errors.iter().take(5) {
        warn!(line = e.line, "skipping sample row: {}", e.message);
    }
    if row_errors.len() > 5 {
        warn!("{} more sample rows skipped", row_errors.len() - 5);
    }

    let rows_used = rows.len();
    if rows_used == 0 {
        return Err(AppError::new(3, format!("No valid rows in '{}'.", path.display())));
    }

    rows.sort_by_key(|r| r.time);
    let dataset = assemble(rows, instrument, has_depth, &has_flags)
        .map_err(|e| AppError::new(2, e.to_string()))?;
    debug!(rows_read, rows_used, "samples loaded");

    Ok(IngestedData {
        dataset,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    instrument: InstrumentKind,
    has_depth: bool,
    flag_columns: &[String],
    has_flags: &[bool],
) -> Result<Row, String> {
    let time = parse_timestamp(get_required(record, header_map, "time")?)?;
    let depth = if has_depth {
        Some(parse_value(get_optional(record, header_map, instrument.depth_parameter()))?)
    } else {
        None
    };

    let mut values = Vec::new();
    let mut flags = Vec::new();
    for (i, p) in instrument.parameters().iter().enumerate() {
        values.push(parse_value(get_optional(record, header_map, p.name))?);
        let flag = if has_flags[i] {
            match get_optional(record, header_map, &flag_columns[i]) {
                Some(s) => Some(parse_flag(s)?),
                None => Some(QcFlag::Pass),
            }
        } else {
            None
        };
        flags.push(flag);
    }

    Ok(Row {
        time,
        depth,
        values,
        flags,
    })
}

fn assemble(
    rows: Vec<Row>,
    instrument: InstrumentKind,
    has_depth: bool,
    has_flags: &[bool],
) -> crate::error::QcResult<Dataset> {
    let times = rows.iter().map(|r| r.time).collect();
    let depth = has_depth.then(|| rows.iter().map(|r| r.depth.unwrap_or(f64::NAN)).collect());

    let series = instrument
        .parameters()
        .iter()
        .enumerate()
        .map(|(i, p)| ParameterSeries {
            name: p.name.to_string(),
            values: rows.iter().map(|r| r.values[i]).collect(),
            flags: has_flags[i].then(|| rows.iter().map(|r| r.flags[i].unwrap_or(QcFlag::Pass)).collect()),
        })
        .collect();

    Dataset::new(times, depth, series)
}

pub(crate) fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

pub(crate) fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

pub(crate) fn get_optional<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse an ISO-8601 timestamp or epoch milliseconds.
///
/// Timestamps without an offset are taken as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    const FMTS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in FMTS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(t.and_utc());
        }
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(t) = d.and_hms_opt(0, 0, 0) {
            return Ok(t.and_utc());
        }
    }
    if let Ok(ms) = s.parse::<i64>() {
        if let Some(t) = Utc.timestamp_millis_opt(ms).single() {
            return Ok(t);
        }
    }
    Err(format!(
        "Invalid timestamp '{s}'. Expected ISO-8601 (YYYY-MM-DDTHH:MM:SS[Z]) or epoch milliseconds."
    ))
}

fn parse_value(s: Option<&str>) -> Result<f64, String> {
    match s {
        None => Ok(f64::NAN),
        Some(s) if s.eq_ignore_ascii_case("nan") => Ok(f64::NAN),
        Some(s) => s.parse::<f64>().map_err(|_| format!("Invalid number '{s}'.")),
    }
}

fn parse_flag(s: &str) -> Result<QcFlag, String> {
    if let Ok(code) = s.parse::<f64>() {
        if code.fract() == 0.0 && (0.0..=255.0).contains(&code) {
            if let Some(flag) = QcFlag::from_code(code as u8) {
                return Ok(flag);
            }
        }
    }
    QcFlag::from_label(s).ok_or_else(|| format!("Invalid QC flag '{s}'."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn timestamps_accept_iso_and_epoch_millis() {
        let expected = Utc.with_ymd_and_hms(2021, 5, 4, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2021-05-04T12:30:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-05-04 12:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-05-04T12:30").unwrap(), expected);
        assert_eq!(parse_timestamp("1620131400000").unwrap(), expected);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn loads_phsen_samples_with_flags_and_depth() {
        let file = write_csv(
            "\u{feff}time,int_ctd_pressure,seawater_ph,seawater_ph_qc_flag\n\
             2021-01-01T02:00:00Z,20.5,8.01,1\n\
             2021-01-01T01:00:00Z,20.1,7.99,4\n\
             not-a-time,20.0,8.0,1\n\
             2021-01-01T03:00:00Z,,,\n",
        );
        let data = load_samples(file.path(), InstrumentKind::Phsen).unwrap();

        assert_eq!(data.rows_read, 4);
        assert_eq!(data.rows_used, 3);
        assert_eq!(data.row_errors.len(), 1);
        assert_eq!(data.row_errors[0].line, 4);

        let ds = &data.dataset;
        assert!(ds.times().windows(2).all(|w| w[0] <= w[1]));
        let ph = ds.parameter("seawater_ph").unwrap();
        assert_eq!(ph.values[0], 7.99);
        assert!(ph.values[2].is_nan());
        assert_eq!(
            ph.flags.as_deref(),
            Some(&[QcFlag::Fail, QcFlag::Pass, QcFlag::Pass][..])
        );
        assert!(ds.depth().unwrap()[2].is_nan());
    }

    #[test]
    fn missing_value_column_is_a_schema_error() {
        let file = write_csv("time,seawater_temperature\n2021-01-01T00:00:00Z,10\n");
        let err = load_samples(file.path(), InstrumentKind::Ctdbp).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("practical_salinity"));
    }

    #[test]
    fn flag_labels_and_codes_are_both_read() {
        assert_eq!(parse_flag("4").unwrap(), QcFlag::Fail);
        assert_eq!(parse_flag("3.0").unwrap(), QcFlag::Suspect);
        assert_eq!(parse_flag("suspect").unwrap(), QcFlag::Suspect);
        assert!(parse_flag("2").is_err());
    }
}
