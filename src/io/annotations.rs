//! Historical annotation ingest.
//!
//! Reads the annotation-service export (`id, subsite, node, sensor, method,
//! stream, parameters, beginDate, endDate, exclusionFlag, qcFlag, source,
//! annotation`). Malformed records are logged and left out; they never stop
//! the run.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::{Annotation, AnnotationOrigin, QcFlag};
use crate::error::{AppError, QcError, QcResult};
use crate::io::ingest::{build_header_map, get_optional, get_required, parse_timestamp};

/// Parsed annotations plus the records that were rejected.
#[derive(Debug, Clone, Default)]
pub struct LoadedAnnotations {
    pub annotations: Vec<Annotation>,
    pub rejected: Vec<QcError>,
}

pub fn load_annotations(path: &Path) -> Result<LoadedAnnotations, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to open annotations CSV '{}': {e}", path.display()),
        )
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read annotation headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let mut loaded = LoadedAnnotations::default();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let parsed = result
            .map_err(|e| malformed(line, format!("CSV parse error: {e}")))
            .and_then(|record| parse_annotation(&record, &header_map, line));
        match parsed {
            Ok(anno) => loaded.annotations.push(anno),
            Err(err) => {
                warn!("{err}");
                loaded.rejected.push(err);
            }
        }
    }

    debug!(
        kept = loaded.annotations.len(),
        rejected = loaded.rejected.len(),
        "historical annotations loaded"
    );
    Ok(loaded)
}

fn parse_annotation(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    line: usize,
) -> QcResult<Annotation> {
    let subsite = get_required(record, header_map, "subsite")
        .map_err(|m| malformed(line, m))?
        .to_string();
    let begin = get_required(record, header_map, "beginDate")
        .and_then(parse_timestamp)
        .map_err(|m| malformed(line, m))?;
    let end = get_optional(record, header_map, "endDate")
        .map(parse_timestamp)
        .transpose()
        .map_err(|m| malformed(line, m))?;
    if end.is_some_and(|end| end < begin) {
        return Err(malformed(line, "endDate precedes beginDate"));
    }

    let id = get_optional(record, header_map, "id")
        .map(|s| s.parse::<i64>().map_err(|_| malformed(line, format!("invalid id '{s}'"))))
        .transpose()?;
    let parameters = get_optional(record, header_map, "parameters")
        .map(|s| parse_parameter_ids(s).map_err(|m| malformed(line, m)))
        .transpose()?
        .unwrap_or_default();
    let exclusion_flag = get_optional(record, header_map, "exclusionFlag")
        .map(|s| parse_bool(s).map_err(|m| malformed(line, m)))
        .transpose()?
        .unwrap_or(false);

    // `not_evaluated` carries no verdict of its own; the exclusion flag decides.
    let label = get_optional(record, header_map, "qcFlag")
        .filter(|s| !s.trim().eq_ignore_ascii_case("not_evaluated"));
    let qc_flag = match label {
        Some(s) => QcFlag::from_label(s).ok_or_else(|| malformed(line, format!("unknown qcFlag '{s}'")))?,
        None if exclusion_flag => QcFlag::Fail,
        None => QcFlag::Pass,
    };

    let text = |name: &str| get_optional(record, header_map, name).map(str::to_string);

    Ok(Annotation {
        id,
        subsite,
        node: text("node"),
        sensor: text("sensor"),
        method: text("method"),
        stream: text("stream"),
        parameters,
        begin,
        end,
        exclusion_flag,
        qc_flag,
        source: text("source").unwrap_or_default(),
        annotation: text("annotation").unwrap_or_default(),
        origin: AnnotationOrigin::Historical,
    })
}

fn malformed(line: usize, message: impl Into<String>) -> QcError {
    QcError::MalformedAnnotation {
        line,
        message: message.into(),
    }
}

/// `"[22, 1141]"`, `"22;1141"` and `"22"` all give `[22, 1141]`-style lists.
fn parse_parameter_ids(s: &str) -> Result<Vec<u32>, String> {
    s.split(|c: char| c == ',' || c == ';' || c == ' ' || c == '[' || c == ']')
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<u32>().map_err(|_| format!("invalid parameter id '{t}'")))
        .collect()
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(format!("invalid exclusionFlag '{s}'")),
    }
}
