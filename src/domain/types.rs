//! Shared domain types.
//!
//! These types are intentionally kept lightweight and immutable so they can be:
//!
//! - produced once per invocation by the estimators
//! - packaged into lookup records and CSV tables
//! - parsed back from those tables for comparisons

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{InstrumentKind, Platform};
use crate::error::QcError;

/// Per-sample QC flag, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QcFlag {
    Pass,
    Suspect,
    Fail,
}

impl QcFlag {
    /// QARTOD numeric code.
    pub fn code(self) -> u8 {
        match self {
            QcFlag::Pass => 1,
            QcFlag::Suspect => 3,
            QcFlag::Fail => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(QcFlag::Pass),
            3 => Some(QcFlag::Suspect),
            4 => Some(QcFlag::Fail),
            _ => None,
        }
    }

    /// Label used in annotation records.
    pub fn label(self) -> &'static str {
        match self {
            QcFlag::Pass => "pass",
            QcFlag::Suspect => "suspect",
            QcFlag::Fail => "fail",
        }
    }

    /// Parse an annotation-service label.
    ///
    /// `not_operational`, `not_available` and `pending_ingest` mark data that
    /// must never feed a threshold, so they collapse to `Fail`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "pass" | "1" => Some(QcFlag::Pass),
            "suspect" | "of_interest" | "3" => Some(QcFlag::Suspect),
            "fail" | "not_operational" | "not_available" | "pending_ingest" | "4" | "9" => {
                Some(QcFlag::Fail)
            }
            _ => None,
        }
    }
}

/// A maximal run of fail-flagged samples after gap merging (inclusive indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureBlock {
    pub start: usize,
    pub end: usize,
}

impl FailureBlock {
    /// Samples spanned, first to last inclusive.
    pub fn span(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Gap-merging and noise thresholds for block identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockParams {
    /// Longest run of passing samples bridged inside one block.
    pub max_gap: usize,
    /// Shortest span (in samples) reported as a block.
    pub min_duration: usize,
    /// Evaluate every `stride`-th sample only.
    pub stride: usize,
}

impl BlockParams {
    pub const fn new(max_gap: usize, min_duration: usize) -> Self {
        Self {
            max_gap,
            min_duration,
            stride: 1,
        }
    }

    pub const fn with_stride(self, stride: usize) -> Self {
        Self { stride, ..self }
    }
}

impl Default for BlockParams {
    fn default() -> Self {
        Self::new(24, 24)
    }
}

/// Knobs shared by the gross range and climatology estimators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    /// Standard-deviation multiplier `k` for user bounds and band half-widths.
    pub sigma_multiplier: f64,
    /// Harmonic order `K` (1 = annual, 2 = annual + semiannual).
    pub harmonics: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            sigma_multiplier: 3.0,
            harmonics: 2,
        }
    }
}

/// `(min, max)` sensor calibration range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorBounds {
    pub min: f64,
    pub max: f64,
}

impl SensorBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Strict containment; values on the bounds are treated as railed sensors.
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && self.min < value && value < self.max
    }
}

/// Static gross range limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrossRangeSpec {
    pub sensor_min: f64,
    pub sensor_max: f64,
    pub user_min: f64,
    pub user_max: f64,
}

impl GrossRangeSpec {
    /// `sensor_min <= user_min <= user_max <= sensor_max`.
    pub fn is_ordered(&self) -> bool {
        self.sensor_min <= self.user_min
            && self.user_min <= self.user_max
            && self.user_max <= self.sensor_max
    }
}

/// Depth stratum `(lower, upper)`; samples strictly inside belong to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthBin {
    pub lower: f64,
    pub upper: f64,
}

impl DepthBin {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, depth: f64) -> bool {
        self.lower < depth && depth < self.upper
    }
}

impl fmt::Display for DepthBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.lower, self.upper)
    }
}

/// Acceptance interval for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRange {
    pub center: f64,
    pub half_width: f64,
}

impl MonthlyRange {
    pub fn from_bounds(min: f64, max: f64) -> Self {
        Self {
            center: (min + max) / 2.0,
            half_width: (max - min) / 2.0,
        }
    }

    pub fn min(&self) -> f64 {
        self.center - self.half_width
    }

    pub fn max(&self) -> f64 {
        self.center + self.half_width
    }
}

/// One table row: an optional depth bin and its 12 monthly ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimatologyRow {
    pub bin: Option<DepthBin>,
    pub months: [MonthlyRange; 12],
}

/// A depth bin that was left out of the table, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedBin {
    pub bin: DepthBin,
    pub reason: QcError,
}

/// Climatology output: one row per depth bin (or a single unbinned row).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClimatologyTable {
    pub rows: Vec<ClimatologyRow>,
    pub skipped: Vec<SkippedBin>,
}

impl ClimatologyTable {
    pub fn is_binned(&self) -> bool {
        self.rows.iter().any(|r| r.bin.is_some())
    }
}

/// Reference designator of a single instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceDesignator {
    pub site: String,
    pub node: String,
    pub sensor: String,
}

impl ReferenceDesignator {
    pub fn new(site: impl Into<String>, node: impl Into<String>, sensor: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            node: node.into(),
            sensor: sensor.into(),
        }
    }

    /// `SITE-NODE-SENSOR`, used as the file-name stem for outputs.
    pub fn stem(&self) -> String {
        format!("{}-{}-{}", self.site, self.node, self.sensor)
    }
}

/// Where an annotation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationOrigin {
    /// Retrieved from the annotation service.
    Historical,
    /// Generated from a failure block, pending human review.
    Generated,
}

/// A flagged time interval.
///
/// An empty `parameters` list applies the annotation to every parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: Option<i64>,
    pub subsite: String,
    pub node: Option<String>,
    pub sensor: Option<String>,
    pub method: Option<String>,
    pub stream: Option<String>,
    pub parameters: Vec<u32>,
    pub begin: DateTime<Utc>,
    /// `None` means the annotation is still open.
    pub end: Option<DateTime<Utc>>,
    pub exclusion_flag: bool,
    pub qc_flag: QcFlag,
    pub source: String,
    pub annotation: String,
    pub origin: AnnotationOrigin,
}

impl Annotation {
    /// Whether this annotation affects a parameter known by any of `ids`.
    ///
    /// An empty `ids` asks about the instrument as a whole.
    pub fn applies_to(&self, ids: &[u32]) -> bool {
        ids.is_empty() || self.parameters.is_empty() || ids.iter().any(|id| self.parameters.contains(id))
    }

    /// Whether the annotation targets this instrument (node and sensor may be
    /// left blank to cover a whole site or node).
    pub fn targets(&self, designator: &ReferenceDesignator) -> bool {
        self.subsite == designator.site
            && self.node.as_ref().is_none_or(|n| *n == designator.node)
            && self.sensor.as_ref().is_none_or(|s| *s == designator.sensor)
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub designator: ReferenceDesignator,
    pub instrument: InstrumentKind,
    pub platform: Platform,
    pub input_path: PathBuf,
    pub annotations_path: Option<PathBuf>,
    pub output_dir: PathBuf,

    /// Data collected after this instant is ignored.
    pub cut_off: Option<DateTime<Utc>>,
    /// Data collected before this instant is ignored.
    pub start: DateTime<Utc>,

    /// Median resampling window for fixed platforms (0 disables).
    pub resample_minutes: u32,

    pub estimator: EstimatorConfig,
    /// Replaces the instrument's own block thresholds when set.
    pub block_override: Option<BlockParams>,

    /// Decimal places used when writing the climatology table.
    pub table_decimals: usize,
}
