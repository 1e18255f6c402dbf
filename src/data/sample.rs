//! Synthetic sensor series.
//!
//! Produces a deterministic seasonal series for every parameter of an
//! instrument, with Gaussian noise, optional profiler depths and injected
//! failure runs carrying raw fail flags. Used for demos and tests.

use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::dataset::{Dataset, ParameterSeries};
use crate::domain::{InstrumentKind, Platform, QcFlag};
use crate::error::{QcError, QcResult};
use crate::math::{harmonic_pair, year_fraction};

/// Share of the sensor range used for the annual amplitude.
const ANNUAL_AMPLITUDE: f64 = 0.08;
/// Share of the sensor range used for the noise standard deviation.
const NOISE_SCALE: f64 = 0.01;
/// Probability of a single-sample flag spike.
const SPIKE_PROB: f64 = 0.002;

/// Synthetic series settings.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub instrument: InstrumentKind,
    pub platform: Platform,
    pub start: DateTime<Utc>,
    pub days: u32,
    pub step_minutes: u32,
    /// Number of injected failure runs per parameter.
    pub fail_runs: usize,
    pub seed: u64,
}

/// `n` draws from `N(mean, sd)`.
pub fn normal_values(mean: f64, sd: f64, n: usize, seed: u64) -> QcResult<Vec<f64>> {
    let normal = Normal::new(mean, sd)
        .map_err(|e| QcError::invalid_input(format!("noise distribution error: {e}")))?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..n).map(|_| normal.sample(&mut rng)).collect())
}

/// Time of the `index`-th sample, `step_minutes` apart from `start`.
fn sample_time(start: DateTime<Utc>, step_minutes: u32, index: usize) -> QcResult<DateTime<Utc>> {
    i64::try_from(index)
        .ok()
        .and_then(|i| i.checked_mul(i64::from(step_minutes)))
        .and_then(Duration::try_minutes)
        .and_then(|offset| start.checked_add_signed(offset))
        .ok_or_else(|| {
            QcError::invalid_input(format!("sample {index} falls outside the supported time range"))
        })
}

pub fn generate_series(config: &SynthConfig) -> QcResult<Dataset> {
    if config.days == 0 || config.step_minutes == 0 {
        return Err(QcError::invalid_input("synthetic series needs days > 0 and step > 0"));
    }

    let n = (u64::from(config.days) * 1440 / u64::from(config.step_minutes)) as usize;
    let times = (0..n)
        .map(|i| sample_time(config.start, config.step_minutes, i))
        .collect::<QcResult<Vec<_>>>()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let depth = profile_depths(config.platform, n, &mut rng);

    let mut series = Vec::new();
    for (p, spec) in config.instrument.parameters().iter().enumerate() {
        let bounds = spec.sensor_bounds;
        let span = bounds.max - bounds.min;
        let level = bounds.min + 0.4 * span;
        let noise = normal_values(0.0, NOISE_SCALE * span, n, config.seed.wrapping_add(p as u64 + 1))?;

        let values: Vec<f64> = times
            .iter()
            .zip(noise)
            .enumerate()
            .map(|(i, (t, e))| {
                let (c1, _) = harmonic_pair(year_fraction(*t), 1);
                // Seasonal signal weakens with depth.
                let attenuation = depth.as_ref().map_or(1.0, |d| 1.0 / (1.0 + d[i] / 200.0));
                level - ANNUAL_AMPLITUDE * span * c1 * attenuation + e
            })
            .collect();

        let flags = inject_failures(n, config.fail_runs, &mut rng);
        series.push(ParameterSeries {
            name: spec.name.to_string(),
            values,
            flags: Some(flags),
        });
    }

    Dataset::new(times, depth, series)
}

fn profile_depths(platform: Platform, n: usize, rng: &mut StdRng) -> Option<Vec<f64>> {
    let (top, bottom) = match platform {
        Platform::Fixed => return None,
        Platform::ShallowProfiler => (6.0, 200.0),
        Platform::DeepProfiler(node) => (200.0, node.max_depth()),
    };
    Some((0..n).map(|_| rng.gen_range(top..bottom)).collect())
}

fn inject_failures(n: usize, runs: usize, rng: &mut StdRng) -> Vec<QcFlag> {
    let mut flags = vec![QcFlag::Pass; n];
    if n == 0 {
        return flags;
    }

    for flag in flags.iter_mut() {
        if rng.r#gen::<f64>() < SPIKE_PROB {
            *flag = QcFlag::Fail;
        }
    }

    let max_len = (n / 20).max(1);
    for _ in 0..runs {
        let len = rng.gen_range(1..=max_len);
        let start = rng.gen_range(0..n);
        for flag in flags.iter_mut().skip(start).take(len) {
            *flag = QcFlag::Fail;
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeepProfilerNode;
    use chrono::TimeZone;

    #[test]
    fn sample_times_do_not_wrap_past_i32() {
        let start = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        let index = 3_000_000_000usize;
        let t = sample_time(start, 1, index).unwrap();
        assert_eq!((t - start).num_minutes(), 3_000_000_000);
        assert!(sample_time(start, u32::MAX, usize::MAX).is_err());
    }

    fn config(platform: Platform) -> SynthConfig {
        SynthConfig {
            instrument: InstrumentKind::Flort,
            platform,
            start: Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap(),
            days: 30,
            step_minutes: 60,
            fail_runs: 2,
            seed: 42,
        }
    }

    #[test]
    fn same_seed_gives_same_series() {
        let a = generate_series(&config(Platform::ShallowProfiler)).unwrap();
        let b = generate_series(&config(Platform::ShallowProfiler)).unwrap();
        assert_eq!(a.times(), b.times());
        for (sa, sb) in a.series().iter().zip(b.series()) {
            assert_eq!(sa.flags, sb.flags);
            for (x, y) in sa.values.iter().zip(&sb.values) {
                assert_eq!(x.to_bits(), y.to_bits());
            }
        }
    }

    #[test]
    fn series_matches_instrument_layout() {
        let ds = generate_series(&config(Platform::Fixed)).unwrap();
        assert_eq!(ds.len(), 30 * 24);
        assert!(ds.depth().is_none());
        let names: Vec<&str> = ds.series().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["bback", "estimated_chlorophyll", "fluorometric_cdom"]);
        assert!(ds.series().iter().all(|s| s.flags.as_ref().is_some_and(|f| f.contains(&QcFlag::Fail))));
    }

    #[test]
    fn deep_profiler_depths_stay_in_range() {
        let ds = generate_series(&config(Platform::DeepProfiler(DeepProfilerNode::Dp01b))).unwrap();
        let depth = ds.depth().unwrap();
        assert!(depth.iter().all(|d| (200.0..600.0).contains(d)));
    }

    #[test]
    fn normal_values_are_seeded() {
        let a = normal_values(0.0, 1.0, 100, 3).unwrap();
        let b = normal_values(0.0, 1.0, 100, 3).unwrap();
        assert_eq!(a, b);
        assert!(normal_values(0.0, -1.0, 10, 3).is_err());
    }
}
