//! Lookup record assembly.
//!
//! Turns estimator outputs into the row shapes consumed by the QC lookup
//! tables. JSON-valued columns are serialised here so the CSV writer only
//! deals with flat string records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::domain::{Annotation, EstimatorConfig, GrossRangeSpec, InstrumentKind, ParameterSpec, ReferenceDesignator};
use crate::error::{QcError, QcResult};

/// Directory (relative to the lookup CSVs) holding the climatology tables.
pub const TABLE_DIR: &str = "climatology_tables";

/// Timestamp layout used for annotation dates.
const ANNOTATION_DATE_FMT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrossRangeRecord {
    pub subsite: String,
    pub node: String,
    pub sensor: String,
    pub stream: String,
    pub parameter: String,
    #[serde(rename = "qcConfig")]
    pub qc_config: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimatologyRecord {
    pub subsite: String,
    pub node: String,
    pub sensor: String,
    pub stream: String,
    pub parameters: String,
    #[serde(rename = "climatologyTable")]
    pub climatology_table: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRecord {
    pub id: Option<i64>,
    pub subsite: String,
    pub node: Option<String>,
    pub sensor: Option<String>,
    pub method: Option<String>,
    pub stream: Option<String>,
    pub parameters: String,
    #[serde(rename = "beginDate")]
    pub begin_date: String,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    #[serde(rename = "exclusionFlag")]
    pub exclusion_flag: bool,
    #[serde(rename = "qcFlag")]
    pub qc_flag: String,
    pub source: String,
    pub annotation: String,
}

/// Shared context for all records of one run.
#[derive(Debug, Clone, Copy)]
pub struct LookupContext<'a> {
    pub designator: &'a ReferenceDesignator,
    pub instrument: InstrumentKind,
    /// Last instant of data that fed the estimates.
    pub through: DateTime<Utc>,
    pub estimator: &'a EstimatorConfig,
}

impl LookupContext<'_> {
    fn source_date(&self) -> String {
        self.through.format("%Y-%m-%d").to_string()
    }

    pub fn gross_range_source(&self) -> String {
        format!(
            "Sensor min/max based on the vendor standard calibration range. The user min/max is the \
             historical mean of all data collected up to {} +/- {} standard deviations.",
            self.source_date(),
            self.estimator.sigma_multiplier
        )
    }

    pub fn climatology_source(&self) -> String {
        format!(
            "The variance is based on the standard deviation of the residuals of a {}-harmonic \
             seasonal fit to all data collected up to {}; monthly ranges are the fitted cycle \
             +/- {} standard deviations.",
            self.estimator.harmonics,
            self.source_date(),
            self.estimator.sigma_multiplier
        )
    }
}

/// `SITE-NODE-SENSOR-parameter.csv`.
pub fn table_file_name(designator: &ReferenceDesignator, param: &ParameterSpec) -> String {
    format!("{}-{}.csv", designator.stem(), param.name)
}

pub fn gross_range_record(
    ctx: &LookupContext<'_>,
    param: &ParameterSpec,
    spec: &GrossRangeSpec,
) -> QcResult<GrossRangeRecord> {
    let qc_config = json!({
        "sensor": [spec.sensor_min, spec.sensor_max],
        "user": [spec.user_min, spec.user_max],
    });
    Ok(GrossRangeRecord {
        subsite: ctx.designator.site.clone(),
        node: ctx.designator.node.clone(),
        sensor: ctx.designator.sensor.clone(),
        stream: ctx.instrument.stream().to_string(),
        parameter: to_json(&json!({ "inp": param.inp }))?,
        qc_config: to_json(&qc_config)?,
        source: ctx.gross_range_source(),
    })
}

/// Climatology lookup row; `binned` selects the depth variable as `zinp`.
pub fn climatology_record(
    ctx: &LookupContext<'_>,
    param: &ParameterSpec,
    binned: bool,
) -> QcResult<ClimatologyRecord> {
    let zinp = if binned { ctx.instrument.depth_parameter() } else { "None" };
    let parameters = json!({ "inp": param.inp, "tinp": "time", "zinp": zinp });
    Ok(ClimatologyRecord {
        subsite: ctx.designator.site.clone(),
        node: ctx.designator.node.clone(),
        sensor: ctx.designator.sensor.clone(),
        stream: ctx.instrument.stream().to_string(),
        parameters: to_json(&parameters)?,
        climatology_table: format!("{TABLE_DIR}/{}", table_file_name(ctx.designator, param)),
        source: ctx.climatology_source(),
    })
}

pub fn annotation_record(anno: &Annotation) -> QcResult<AnnotationRecord> {
    Ok(AnnotationRecord {
        id: anno.id,
        subsite: anno.subsite.clone(),
        node: anno.node.clone(),
        sensor: anno.sensor.clone(),
        method: anno.method.clone(),
        stream: anno.stream.clone(),
        parameters: to_json(&anno.parameters)?,
        begin_date: anno.begin.format(ANNOTATION_DATE_FMT).to_string(),
        end_date: anno.end.map(|t| t.format(ANNOTATION_DATE_FMT).to_string()),
        exclusion_flag: anno.exclusion_flag,
        qc_flag: anno.qc_flag.label().to_string(),
        source: anno.source.clone(),
        annotation: anno.annotation.clone(),
    })
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> QcResult<String> {
    serde_json::to_string(value).map_err(|e| QcError::invalid_input(format!("JSON encoding failed: {e}")))
}
