//! Depth bin schemes for profiling platforms.
//!
//! Bins are built from integer edges so adjacent bins share their edge exactly.

use crate::domain::{DepthBin, InstrumentKind, Platform};

/// Shallow profiler: 1 m bins from 6 m to 105 m.
const SHALLOW_FINE: (u32, u32, u32) = (6, 105, 1);
/// Shallow profiler: 5 m bins from 105 m to 200 m.
const SHALLOW_COARSE: (u32, u32, u32) = (105, 200, 5);
/// Deep profilers start at the shallow profiler's floor.
const DEEP_TOP: u32 = 200;
const DEEP_STEP: u32 = 5;

/// Downcast holding depths of the shallow profiler pH sensor.
const PHSEN_STEPPED_EDGES: [f64; 13] = [
    15.0, 25.0, 35.0, 45.0, 55.0, 65.0, 75.0, 85.0, 95.0, 105.0, 115.0, 150.0, 195.0,
];

/// Pair consecutive edges into bins. Fewer than two edges gives no bins.
pub fn bins_from_edges(edges: &[f64]) -> Vec<DepthBin> {
    edges.windows(2).map(|w| DepthBin::new(w[0], w[1])).collect()
}

fn stepped_edges(from: u32, to: u32, step: u32) -> impl Iterator<Item = f64> {
    (from..=to).step_by(step as usize).map(f64::from)
}

pub fn shallow_profiler_bins() -> Vec<DepthBin> {
    let (f0, f1, fs) = SHALLOW_FINE;
    let (c0, c1, cs) = SHALLOW_COARSE;
    let edges: Vec<f64> = stepped_edges(f0, f1, fs)
        .chain(stepped_edges(c0, c1, cs).skip(1))
        .collect();
    bins_from_edges(&edges)
}

/// 5 m bins from 200 m down to `max_depth` (rounded down to a whole step).
pub fn deep_profiler_bins(max_depth: f64) -> Vec<DepthBin> {
    if !max_depth.is_finite() || max_depth <= f64::from(DEEP_TOP) {
        return Vec::new();
    }
    let bottom = max_depth.floor() as u32;
    let edges: Vec<f64> = stepped_edges(DEEP_TOP, bottom, DEEP_STEP).collect();
    bins_from_edges(&edges)
}

pub fn phsen_stepped_bins() -> Vec<DepthBin> {
    bins_from_edges(&PHSEN_STEPPED_EDGES)
}

/// Depth bins for an instrument on a platform; `None` on fixed platforms.
pub fn depth_bins_for(instrument: InstrumentKind, platform: Platform) -> Option<Vec<DepthBin>> {
    match (instrument, platform) {
        (_, Platform::Fixed) => None,
        (InstrumentKind::Phsen, Platform::ShallowProfiler) => Some(phsen_stepped_bins()),
        (_, Platform::ShallowProfiler) => Some(shallow_profiler_bins()),
        (_, Platform::DeepProfiler(node)) => Some(deep_profiler_bins(node.max_depth())),
    }
}
