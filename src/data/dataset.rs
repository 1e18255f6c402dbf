//! Immutable multi-parameter time series.
//!
//! Every preparation stage (windowing, exclusion, resampling) consumes a
//! `Dataset` by reference and returns a new one, so a series handed to an
//! estimator is never mutated behind its back.

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::QcFlag;
use crate::error::{QcError, QcResult};
use crate::math::median;

/// Values (and optional raw QC flags) of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSeries {
    pub name: String,
    pub values: Vec<f64>,
    pub flags: Option<Vec<QcFlag>>,
}

/// Samples sorted by time, sharing timestamps and depth across parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    times: Vec<DateTime<Utc>>,
    depth: Option<Vec<f64>>,
    series: Vec<ParameterSeries>,
}

impl Dataset {
    pub fn new(
        times: Vec<DateTime<Utc>>,
        depth: Option<Vec<f64>>,
        series: Vec<ParameterSeries>,
    ) -> QcResult<Self> {
        let n = times.len();
        if times.windows(2).any(|w| w[0] > w[1]) {
            return Err(QcError::invalid_input("timestamps must be sorted ascending"));
        }
        if let Some(d) = &depth {
            if d.len() != n {
                return Err(QcError::invalid_input(format!("{} timestamps but {} depths", n, d.len())));
            }
        }
        for s in &series {
            if s.values.len() != n {
                return Err(QcError::invalid_input(format!(
                    "{} timestamps but {} values for {}",
                    n,
                    s.values.len(),
                    s.name
                )));
            }
            if s.flags.as_ref().is_some_and(|f| f.len() != n) {
                return Err(QcError::invalid_input(format!("flag length mismatch for {}", s.name)));
            }
        }
        Ok(Self { times, depth, series })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn depth(&self) -> Option<&[f64]> {
        self.depth.as_deref()
    }

    pub fn series(&self) -> &[ParameterSeries] {
        &self.series
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.times.last().copied()
    }

    /// Keep samples with `start <= t <= end`.
    pub fn window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Dataset {
        let lo = self.times.partition_point(|t| *t < start);
        let hi = self.times.partition_point(|t| *t <= end).max(lo);
        self.slice(lo, hi)
    }

    /// Replace the values of `name` at masked positions with NaN.
    ///
    /// Other parameters are untouched; each parameter is cleaned with its own
    /// mask.
    pub fn exclude(&self, name: &str, mask: &[bool]) -> QcResult<Dataset> {
        if mask.len() != self.len() {
            return Err(QcError::invalid_input(format!(
                "exclusion mask has {} entries for {} samples",
                mask.len(),
                self.len()
            )));
        }
        if self.parameter(name).is_none() {
            return Err(QcError::invalid_input(format!("unknown parameter {name}")));
        }

        let series = self
            .series
            .iter()
            .map(|s| {
                if s.name != name {
                    return s.clone();
                }
                let values = s
                    .values
                    .iter()
                    .zip(mask)
                    .map(|(&v, &drop)| if drop { f64::NAN } else { v })
                    .collect();
                ParameterSeries {
                    name: s.name.clone(),
                    values,
                    flags: s.flags.clone(),
                }
            })
            .collect();

        Ok(Dataset {
            times: self.times.clone(),
            depth: self.depth.clone(),
            series,
        })
    }

    /// Median of every parameter (and depth) in fixed windows of `minutes`,
    /// aligned to the Unix epoch and labelled at the window centre.
    ///
    /// Windows without samples produce no row. Raw flags do not survive
    /// resampling.
    pub fn resample_median(&self, minutes: u32) -> QcResult<Dataset> {
        if minutes == 0 {
            return Err(QcError::invalid_input("resample window must be > 0 minutes"));
        }
        let width = i64::from(minutes) * 60;

        let mut groups: Vec<(i64, usize, usize)> = Vec::new();
        for (i, t) in self.times.iter().enumerate() {
            let key = t.timestamp().div_euclid(width);
            match groups.last_mut() {
                Some((k, _, end)) if *k == key => *end = i + 1,
                _ => groups.push((key, i, i + 1)),
            }
        }

        let mut times = Vec::with_capacity(groups.len());
        for &(key, _, _) in &groups {
            let label = key * width + width / 2;
            let t = Utc
                .timestamp_opt(label, 0)
                .single()
                .ok_or_else(|| QcError::invalid_input(format!("resampled timestamp {label} out of range")))?;
            times.push(t);
        }

        let reduce = |values: &[f64]| -> Vec<f64> {
            groups
                .iter()
                .map(|&(_, lo, hi)| median(&values[lo..hi]).unwrap_or(f64::NAN))
                .collect()
        };

        let depth = self.depth.as_deref().map(reduce);
        let series = self
            .series
            .iter()
            .map(|s| ParameterSeries {
                name: s.name.clone(),
                values: reduce(&s.values),
                flags: None,
            })
            .collect();

        Ok(Dataset { times, depth, series })
    }

    fn slice(&self, lo: usize, hi: usize) -> Dataset {
        Dataset {
            times: self.times[lo..hi].to_vec(),
            depth: self.depth.as_ref().map(|d| d[lo..hi].to_vec()),
            series: self
                .series
                .iter()
                .map(|s| ParameterSeries {
                    name: s.name.clone(),
                    values: s.values[lo..hi].to_vec(),
                    flags: s.flags.as_ref().map(|f| f[lo..hi].to_vec()),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn hourly(n: usize) -> Vec<DateTime<Utc>> {
        let t0 = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| t0 + Duration::hours(i as i64)).collect()
    }

    fn dataset(n: usize) -> Dataset {
        Dataset::new(
            hourly(n),
            Some((0..n).map(|i| i as f64).collect()),
            vec![
                ParameterSeries {
                    name: "a".to_string(),
                    values: (0..n).map(|i| i as f64 * 10.0).collect(),
                    flags: Some(vec![QcFlag::Pass; n]),
                },
                ParameterSeries {
                    name: "b".to_string(),
                    values: vec![1.0; n],
                    flags: None,
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn unsorted_or_ragged_input_is_rejected() {
        let mut times = hourly(3);
        times.swap(0, 2);
        assert!(Dataset::new(times, None, vec![]).is_err());

        let series = vec![ParameterSeries {
            name: "a".to_string(),
            values: vec![1.0],
            flags: None,
        }];
        assert!(Dataset::new(hourly(2), None, series).is_err());
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let ds = dataset(10);
        let times = ds.times().to_vec();
        let w = ds.window(times[2], times[5]);
        assert_eq!(w.len(), 4);
        assert_eq!(w.times().first(), Some(&times[2]));
        assert_eq!(w.last_time(), Some(times[5]));
        assert_eq!(w.parameter("a").unwrap().values, vec![20.0, 30.0, 40.0, 50.0]);

        assert!(ds.window(times[6], times[3]).is_empty());
    }

    #[test]
    fn exclude_only_touches_one_parameter() {
        let ds = dataset(3);
        let out = ds.exclude("a", &[false, true, false]).unwrap();
        let a = &out.parameter("a").unwrap().values;
        assert!(a[1].is_nan());
        assert_eq!(a[0], 0.0);
        assert_eq!(out.parameter("b").unwrap().values, vec![1.0; 3]);
        assert_eq!(ds.parameter("a").unwrap().values[1], 10.0);

        assert!(ds.exclude("zzz", &[false; 3]).is_err());
        assert!(ds.exclude("a", &[false; 2]).is_err());
    }

    #[test]
    fn resample_takes_medians_in_epoch_aligned_windows() {
        let ds = dataset(7);
        let out = ds.resample_median(180).unwrap();

        // 2020-06-01T00:00Z is a multiple of three hours since the epoch.
        assert_eq!(out.len(), 3);
        let t0 = Utc.with_ymd_and_hms(2020, 6, 1, 1, 30, 0).unwrap();
        assert_eq!(out.times()[0], t0);
        assert_eq!(out.parameter("a").unwrap().values, vec![10.0, 40.0, 60.0]);
        assert_eq!(out.depth().unwrap(), &[1.0, 4.0, 6.0]);
        assert!(out.parameter("a").unwrap().flags.is_none());
    }

    #[test]
    fn resample_median_ignores_excluded_samples() {
        let ds = dataset(3).exclude("a", &[true, false, false]).unwrap();
        let out = ds.resample_median(180).unwrap();
        assert_eq!(out.parameter("a").unwrap().values, vec![15.0]);
        assert!(dataset(3).resample_median(0).is_err());
    }
}
