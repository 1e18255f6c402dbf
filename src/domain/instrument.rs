//! Instrument and platform variants.
//!
//! The instrument kind is chosen once at the command-line boundary and carries
//! everything the pipeline needs to know about the sensor: its stream, the
//! parameters to process, their calibration ranges and how failure runs are
//! detected. Nothing downstream inspects sensor codes.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::{BlockParams, SensorBounds};

/// Per-parameter processing configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    /// Column name in the cleaned series.
    pub name: &'static str,
    /// Variable name used by the QC lookup tables (`inp`).
    pub inp: &'static str,
    pub sensor_bounds: SensorBounds,
    /// Annotation-service parameter ids; empty applies to all parameters.
    pub annotation_ids: &'static [u32],
    /// Failure-run detection, or `None` when the stream carries no usable flags.
    pub blocks: Option<BlockParams>,
}

impl ParameterSpec {
    /// Name of the optional raw flag column for this parameter.
    pub fn flag_column(&self) -> String {
        format!("{}_qc_flag", self.name)
    }
}

const TEMPERATURE: ParameterSpec = ParameterSpec {
    name: "seawater_temperature",
    inp: "seawater_temperature",
    sensor_bounds: SensorBounds::new(-5.0, 35.0),
    annotation_ids: &[],
    blocks: None,
};

const SALINITY: ParameterSpec = ParameterSpec {
    name: "practical_salinity",
    inp: "practical_salinity",
    sensor_bounds: SensorBounds::new(0.0, 42.0),
    annotation_ids: &[],
    blocks: None,
};

const CTD_PARAMS: &[ParameterSpec] = &[TEMPERATURE, SALINITY];

const CTDPFL_PARAMS: &[ParameterSpec] = &[
    ParameterSpec {
        inp: "temp",
        ..TEMPERATURE
    },
    SALINITY,
];

const PHSEN_PARAMS: &[ParameterSpec] = &[ParameterSpec {
    name: "seawater_ph",
    inp: "ph_seawater",
    sensor_bounds: SensorBounds::new(6.9, 9.0),
    annotation_ids: &[],
    blocks: Some(BlockParams::new(24, 24)),
}];

const FLORT_PARAMS: &[ParameterSpec] = &[
    ParameterSpec {
        name: "bback",
        inp: "bback",
        sensor_bounds: SensorBounds::new(0.0, 3.0),
        annotation_ids: &[24, 25, 1139],
        blocks: Some(BlockParams::new(18, 72).with_stride(24)),
    },
    ParameterSpec {
        name: "estimated_chlorophyll",
        inp: "estimated_chlorophyll",
        sensor_bounds: SensorBounds::new(0.0, 30.0),
        annotation_ids: &[22, 1141],
        blocks: Some(BlockParams::new(18, 72)),
    },
    ParameterSpec {
        name: "fluorometric_cdom",
        inp: "fluorometric_cdom",
        sensor_bounds: SensorBounds::new(0.0, 375.0),
        annotation_ids: &[23, 1143],
        blocks: Some(BlockParams::new(18, 72)),
    },
];

/// Supported instrument classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum InstrumentKind {
    /// SBE 16plusV2 CTD on a fixed node.
    Ctdbp,
    /// CTD with SBE 43 dissolved oxygen (shallow profiler science pod).
    CtdpfSbe43,
    /// CTD with optode (200 m platform or CTDPFB).
    CtdpfOptode,
    /// Deep profiler CTD.
    Ctdpfl,
    /// SAMI pH sensor.
    Phsen,
    /// Three-channel fluorometer.
    Flort,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 6] = [
        InstrumentKind::Ctdbp,
        InstrumentKind::CtdpfSbe43,
        InstrumentKind::CtdpfOptode,
        InstrumentKind::Ctdpfl,
        InstrumentKind::Phsen,
        InstrumentKind::Flort,
    ];

    pub fn stream(self) -> &'static str {
        match self {
            InstrumentKind::Ctdbp => "ctdbp_no_sample",
            InstrumentKind::CtdpfSbe43 => "ctdpf_sbe43_sample",
            InstrumentKind::CtdpfOptode => "ctdpf_optode_sample",
            InstrumentKind::Ctdpfl => "dpc_ctd_instrument_recovered",
            InstrumentKind::Phsen => "phsen_data_record",
            InstrumentKind::Flort => "flort_sample",
        }
    }

    pub fn parameters(self) -> &'static [ParameterSpec] {
        match self {
            InstrumentKind::Ctdbp | InstrumentKind::CtdpfSbe43 | InstrumentKind::CtdpfOptode => {
                CTD_PARAMS
            }
            InstrumentKind::Ctdpfl => CTDPFL_PARAMS,
            InstrumentKind::Phsen => PHSEN_PARAMS,
            InstrumentKind::Flort => FLORT_PARAMS,
        }
    }

    /// Pressure variable used as `zinp` for depth-binned climatologies.
    pub fn depth_parameter(self) -> &'static str {
        match self {
            InstrumentKind::Phsen | InstrumentKind::Flort => "int_ctd_pressure",
            _ => "seawater_pressure",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            InstrumentKind::Ctdbp => "CTDBP",
            InstrumentKind::CtdpfSbe43 => "CTDPF (SBE 43)",
            InstrumentKind::CtdpfOptode => "CTDPF (optode)",
            InstrumentKind::Ctdpfl => "CTDPFL",
            InstrumentKind::Phsen => "PHSEN",
            InstrumentKind::Flort => "FLORT",
        }
    }
}

/// Deep profiler moorings and their maximum profiling depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeepProfilerNode {
    Dp01a,
    Dp01b,
    Dp03a,
}

impl DeepProfilerNode {
    pub fn max_depth(self) -> f64 {
        match self {
            DeepProfilerNode::Dp01a => 2900.0,
            DeepProfilerNode::Dp01b => 600.0,
            DeepProfilerNode::Dp03a => 2600.0,
        }
    }
}

/// Deployment platform; decides resampling and depth binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Fixed,
    ShallowProfiler,
    DeepProfiler(DeepProfilerNode),
}

impl Platform {
    pub fn is_profiler(self) -> bool {
        !matches!(self, Platform::Fixed)
    }
}

/// Command-line spelling of [`Platform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    Fixed,
    ShallowProfiler,
    Dp01a,
    Dp01b,
    Dp03a,
}

impl From<PlatformArg> for Platform {
    fn from(value: PlatformArg) -> Self {
        match value {
            PlatformArg::Fixed => Platform::Fixed,
            PlatformArg::ShallowProfiler => Platform::ShallowProfiler,
            PlatformArg::Dp01a => Platform::DeepProfiler(DeepProfilerNode::Dp01a),
            PlatformArg::Dp01b => Platform::DeepProfiler(DeepProfilerNode::Dp01b),
            PlatformArg::Dp03a => Platform::DeepProfiler(DeepProfilerNode::Dp03a),
        }
    }
}
