//! Harmonic climatology estimation.
//!
//! Given:
//! - observed values `y_i` at times `t_i`
//! - a sensor range
//! - optional depths and depth bins
//!
//! we fit a truncated Fourier series in the year fraction by OLS, evaluate it at
//! each month's midpoint to get the band centre, and use `k·std(residuals)` of
//! the whole series as the half-width for every month. Per-month residual
//! subsets are usually too sparse to estimate spread reliably.
//!
//! With depth bins the fit is repeated independently per bin (in parallel).
//! Bins that cannot be fitted are skipped and reported on the table.

use chrono::{DateTime, Utc};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{
    ClimatologyRow, ClimatologyTable, DepthBin, EstimatorConfig, MonthlyRange, SensorBounds, SkippedBin,
};
use crate::error::{QcError, QcResult};
use crate::fit::gross_range::validate;
use crate::math::{mean_std, month_midpoint, solve_least_squares, year_fraction};
use crate::models::{coefficient_len, fill_design_row, predict};

/// A fitted seasonal cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalFit {
    /// `[a0, a1, b1, a2, b2, ...]`.
    pub coefficients: Vec<f64>,
    /// Population standard deviation of `observed - fitted`.
    pub residual_std: f64,
    pub n: usize,
}

impl SeasonalFit {
    /// Band for each calendar month, January first.
    pub fn monthly_ranges(&self, sigma_multiplier: f64) -> [MonthlyRange; 12] {
        let half_width = sigma_multiplier * self.residual_std;
        std::array::from_fn(|i| MonthlyRange {
            center: predict(&self.coefficients, month_midpoint(i as u32 + 1)),
            half_width,
        })
    }
}

/// Fit `value ≈ a0 + Σ a_k cos 2πkt + b_k sin 2πkt` by OLS.
pub fn fit_harmonic(values: &[f64], times: &[DateTime<Utc>], order: usize) -> QcResult<SeasonalFit> {
    if values.len() != times.len() {
        return Err(QcError::invalid_input(format!(
            "{} values but {} timestamps",
            values.len(),
            times.len()
        )));
    }
    if values.is_empty() {
        return Err(QcError::insufficient_data("no samples to fit"));
    }

    let n = values.len();
    let p = coefficient_len(order);
    // An exact interpolation leaves no residual spread and a zero-width band.
    if n <= p {
        return Err(QcError::insufficient_data(format!(
            "{n} samples for {p} harmonic coefficients; at least {} needed",
            p + 1
        )));
    }
    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut row = vec![0.0; p];
    let fractions: Vec<f64> = times.iter().map(|t| year_fraction(*t)).collect();

    for (i, &t) in fractions.iter().enumerate() {
        fill_design_row(order, t, &mut row);
        for (j, v) in row.iter().enumerate() {
            x[(i, j)] = *v;
        }
    }
    let y = DVector::from_column_slice(values);

    let beta = solve_least_squares(&x, &y)?;
    let coefficients: Vec<f64> = beta.iter().copied().collect();

    let residuals: Vec<f64> = values
        .iter()
        .zip(fractions.iter())
        .map(|(&v, &t)| v - predict(&coefficients, t))
        .collect();
    let (_, residual_std) = mean_std(&residuals)
        .ok_or_else(|| QcError::insufficient_data("no residuals"))?;

    Ok(SeasonalFit {
        coefficients,
        residual_std,
        n,
    })
}

/// Compute the monthly climatology table for one parameter.
///
/// Without `depth_bins` the table has a single unbinned row. With bins, each
/// bin is fitted on the samples strictly inside it; bins that have no usable
/// samples or a singular fit are skipped with a warning and listed in
/// `ClimatologyTable::skipped`.
pub fn process_climatology(
    values: &[f64],
    times: &[DateTime<Utc>],
    bounds: SensorBounds,
    depths: Option<&[f64]>,
    depth_bins: Option<&[DepthBin]>,
    config: &EstimatorConfig,
) -> QcResult<ClimatologyTable> {
    validate(bounds, config)?;
    if values.len() != times.len() {
        return Err(QcError::invalid_input(format!(
            "{} values but {} timestamps",
            values.len(),
            times.len()
        )));
    }

    let Some(bins) = depth_bins else {
        let row = fit_row(values, times, bounds, None, config)?;
        return Ok(ClimatologyTable {
            rows: vec![row],
            skipped: Vec::new(),
        });
    };

    if bins.is_empty() {
        return Err(QcError::invalid_input("depth bin list is empty"));
    }
    let depths = depths.ok_or_else(|| QcError::invalid_input("depth bins require depth values"))?;
    if depths.len() != values.len() {
        return Err(QcError::invalid_input(format!(
            "{} values but {} depths",
            values.len(),
            depths.len()
        )));
    }

    // Bins are independent; collect keeps them in input order.
    let results: Vec<(DepthBin, QcResult<ClimatologyRow>)> = bins
        .par_iter()
        .map(|&bin| (bin, fit_bin(values, times, depths, bin, bounds, config)))
        .collect();

    let mut table = ClimatologyTable::default();
    for (bin, result) in results {
        match result {
            Ok(row) => table.rows.push(row),
            Err(reason) => {
                warn!("skipping depth bin {bin}: {reason}");
                table.skipped.push(SkippedBin { bin, reason });
            }
        }
    }

    if table.rows.is_empty() {
        return Err(QcError::insufficient_data(format!(
            "none of the {} depth bins could be fitted",
            bins.len()
        )));
    }
    Ok(table)
}

fn fit_bin(
    values: &[f64],
    times: &[DateTime<Utc>],
    depths: &[f64],
    bin: DepthBin,
    bounds: SensorBounds,
    config: &EstimatorConfig,
) -> QcResult<ClimatologyRow> {
    let mut bin_values = Vec::new();
    let mut bin_times = Vec::new();
    for ((&v, &t), &d) in values.iter().zip(times).zip(depths) {
        if bin.contains(d) {
            bin_values.push(v);
            bin_times.push(t);
        }
    }

    if !bin_values.iter().any(|v| bounds.contains(*v)) {
        return Err(QcError::DepthBinOutOfRange { bin });
    }
    fit_row(&bin_values, &bin_times, bounds, Some(bin), config)
}

fn fit_row(
    values: &[f64],
    times: &[DateTime<Utc>],
    bounds: SensorBounds,
    bin: Option<DepthBin>,
    config: &EstimatorConfig,
) -> QcResult<ClimatologyRow> {
    let (kept_values, kept_times): (Vec<f64>, Vec<DateTime<Utc>>) = values
        .iter()
        .zip(times)
        .filter(|(v, _)| bounds.contains(**v))
        .map(|(v, t)| (*v, *t))
        .unzip();

    if kept_values.is_empty() {
        return Err(QcError::insufficient_data(format!(
            "no values inside sensor range ({}, {}) out of {}",
            bounds.min,
            bounds.max,
            values.len()
        )));
    }

    let fit = fit_harmonic(&kept_values, &kept_times, config.harmonics)?;
    debug!(
        n = fit.n,
        residual_std = fit.residual_std,
        bin = ?bin,
        "harmonic climatology fitted"
    );

    Ok(ClimatologyRow {
        bin,
        months: fit.monthly_ranges(config.sigma_multiplier),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::harmonic_pair;
    use chrono::{Duration, TimeZone};

    fn daily_times(n: usize) -> Vec<DateTime<Utc>> {
        let t0 = Utc.with_ymd_and_hms(2015, 1, 1, 12, 0, 0).unwrap();
        (0..n).map(|i| t0 + Duration::days(i as i64)).collect()
    }

    fn seasonal(t: f64) -> f64 {
        let (c1, _) = harmonic_pair(t, 1);
        let (_, s2) = harmonic_pair(t, 2);
        12.0 + 3.0 * c1 + 1.0 * s2
    }

    fn alternating_series(times: &[DateTime<Utc>]) -> Vec<f64> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| seasonal(year_fraction(*t)) + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect()
    }

    #[test]
    fn recovers_known_seasonal_cycle() {
        let times = daily_times(3 * 365);
        let values = alternating_series(&times);

        let fit = fit_harmonic(&values, &times, 2).unwrap();
        let expect = [12.0, 3.0, 0.0, 0.0, 1.0];
        for (a, b) in fit.coefficients.iter().zip(expect.iter()) {
            assert!((a - b).abs() < 0.01, "coefficients {:?}", fit.coefficients);
        }
        assert!((fit.residual_std - 0.5).abs() < 0.01, "residual_std={}", fit.residual_std);
    }

    #[test]
    fn monthly_centres_follow_the_curve() {
        let times = daily_times(4 * 365);
        let values = alternating_series(&times);
        let table = process_climatology(
            &values,
            &times,
            SensorBounds::new(0.0, 40.0),
            None,
            None,
            &EstimatorConfig::default(),
        )
        .unwrap();

        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert!(row.bin.is_none());
        for (i, m) in row.months.iter().enumerate() {
            let expected = seasonal(month_midpoint(i as u32 + 1));
            assert!((m.center - expected).abs() < 0.02, "month {} centre {}", i + 1, m.center);
            assert!((m.half_width - 1.5).abs() < 0.03);
        }
    }

    #[test]
    fn empty_input_is_insufficient_data() {
        let err = process_climatology(
            &[],
            &[],
            SensorBounds::new(0.0, 1.0),
            None,
            None,
            &EstimatorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, QcError::InsufficientData { .. }));
    }

    #[test]
    fn single_time_of_year_is_a_singular_fit() {
        let times: Vec<DateTime<Utc>> = (2015..2021)
            .map(|y| Utc.with_ymd_and_hms(y, 1, 1, 0, 0, 0).unwrap())
            .collect();
        let values = vec![5.0, 5.1, 4.9, 5.2, 5.0, 4.8];

        let err = process_climatology(
            &values,
            &times,
            SensorBounds::new(0.0, 10.0),
            None,
            None,
            &EstimatorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, QcError::SingularFit { params: 5, .. }));
    }

    #[test]
    fn exact_interpolation_is_insufficient_data() {
        let times: Vec<DateTime<Utc>> = [1, 3, 5, 7, 9]
            .iter()
            .map(|&m| Utc.with_ymd_and_hms(2016, m, 15, 0, 0, 0).unwrap())
            .collect();
        let values = vec![10.0, 12.5, 15.0, 14.0, 11.0];

        let err = process_climatology(
            &values,
            &times,
            SensorBounds::new(0.0, 40.0),
            None,
            None,
            &EstimatorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, QcError::InsufficientData { .. }), "{err:?}");
    }

    #[test]
    fn one_spare_sample_gives_a_real_band() {
        let times: Vec<DateTime<Utc>> = [1, 3, 5, 7, 9, 11]
            .iter()
            .map(|&m| Utc.with_ymd_and_hms(2016, m, 15, 0, 0, 0).unwrap())
            .collect();
        let values = vec![10.0, 12.5, 15.0, 14.0, 11.0, 13.0];

        let fit = fit_harmonic(&values, &times, 2).unwrap();
        assert_eq!(fit.n, 6);
        assert!(fit.residual_std > 1e-6, "residual_std={}", fit.residual_std);
    }

    /// Two years of daily samples at 10.5 m plus extra samples appended at `depth`.
    fn with_extra_bin(
        extra_times: &[DateTime<Utc>],
        extra_value: f64,
        depth: f64,
    ) -> (Vec<DateTime<Utc>>, Vec<f64>, Vec<f64>) {
        let mut times = daily_times(2 * 365);
        let mut values = alternating_series(&times);
        let mut depths = vec![10.5; times.len()];
        times.extend_from_slice(extra_times);
        values.extend(std::iter::repeat(extra_value).take(extra_times.len()));
        depths.extend(std::iter::repeat(depth).take(extra_times.len()));
        (times, values, depths)
    }

    #[test]
    fn bin_with_only_out_of_range_values_is_skipped() {
        let extra = daily_times(20);
        let (times, values, depths) = with_extra_bin(&extra, 55.0, 30.5);
        let bins = [DepthBin::new(10.0, 11.0), DepthBin::new(30.0, 31.0)];

        let table = process_climatology(
            &values,
            &times,
            SensorBounds::new(0.0, 40.0),
            Some(&depths),
            Some(&bins),
            &EstimatorConfig::default(),
        )
        .unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].bin, Some(bins[0]));
        assert_eq!(table.skipped.len(), 1);
        assert_eq!(table.skipped[0].bin, bins[1]);
        assert!(matches!(table.skipped[0].reason, QcError::DepthBinOutOfRange { .. }));
    }

    #[test]
    fn singular_bin_is_skipped_while_others_fit() {
        let extra: Vec<DateTime<Utc>> = (2008..2014)
            .map(|y| Utc.with_ymd_and_hms(y, 1, 1, 0, 0, 0).unwrap())
            .collect();
        let (times, values, depths) = with_extra_bin(&extra, 5.0, 20.5);
        let bins = [DepthBin::new(10.0, 11.0), DepthBin::new(20.0, 21.0)];

        let table = process_climatology(
            &values,
            &times,
            SensorBounds::new(0.0, 40.0),
            Some(&depths),
            Some(&bins),
            &EstimatorConfig::default(),
        )
        .unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].bin, Some(bins[0]));
        assert!(table.rows[0].months.iter().all(|m| m.half_width > 1.0));
        assert_eq!(table.skipped.len(), 1);
        assert_eq!(table.skipped[0].bin, bins[1]);
        assert!(matches!(table.skipped[0].reason, QcError::SingularFit { params: 5, .. }));
    }

    #[test]
    fn depth_bins_fit_independently_and_skip_empty_bins() {
        let times = daily_times(2 * 365);
        let values: Vec<f64> = alternating_series(&times)
            .iter()
            .enumerate()
            .map(|(i, v)| if i % 4 < 2 { *v } else { *v - 5.0 })
            .collect();
        let depths: Vec<f64> = (0..times.len())
            .map(|i| if i % 4 < 2 { 10.5 } else { 20.5 })
            .collect();
        let bins = [
            DepthBin::new(10.0, 11.0),
            DepthBin::new(20.0, 21.0),
            DepthBin::new(30.0, 31.0),
        ];

        let table = process_climatology(
            &values,
            &times,
            SensorBounds::new(0.0, 40.0),
            Some(&depths),
            Some(&bins),
            &EstimatorConfig::default(),
        )
        .unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].bin, Some(bins[0]));
        assert_eq!(table.rows[1].bin, Some(bins[1]));
        assert!(table.rows[0].months[0].center > table.rows[1].months[0].center + 4.0);
        assert_eq!(table.skipped.len(), 1);
        assert_eq!(table.skipped[0].bin, bins[2]);
        assert!(matches!(table.skipped[0].reason, QcError::DepthBinOutOfRange { .. }));
    }

    #[test]
    fn samples_on_bin_edges_belong_to_no_bin() {
        let times = daily_times(400);
        let values = alternating_series(&times);
        let depths = vec![11.0; times.len()];
        let bins = [DepthBin::new(10.0, 11.0), DepthBin::new(11.0, 12.0)];

        let err = process_climatology(
            &values,
            &times,
            SensorBounds::new(0.0, 40.0),
            Some(&depths),
            Some(&bins),
            &EstimatorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, QcError::InsufficientData { .. }));
    }

    #[test]
    fn bins_without_depths_are_rejected() {
        let times = daily_times(10);
        let values = vec![1.0; 10];
        let err = process_climatology(
            &values,
            &times,
            SensorBounds::new(0.0, 2.0),
            None,
            Some(&[DepthBin::new(0.0, 1.0)]),
            &EstimatorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, QcError::InvalidInput { .. }));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let times = daily_times(800);
        let values = alternating_series(&times);
        let depths: Vec<f64> = (0..times.len()).map(|i| 6.5 + (i % 3) as f64).collect();
        let bins = [
            DepthBin::new(6.0, 7.0),
            DepthBin::new(7.0, 8.0),
            DepthBin::new(8.0, 9.0),
        ];
        let run = || {
            process_climatology(
                &values,
                &times,
                SensorBounds::new(0.0, 40.0),
                Some(&depths),
                Some(&bins),
                &EstimatorConfig::default(),
            )
            .unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a, b);
        for (ra, rb) in a.rows.iter().zip(b.rows.iter()) {
            for (ma, mb) in ra.months.iter().zip(rb.months.iter()) {
                assert_eq!(ma.center.to_bits(), mb.center.to_bits());
                assert_eq!(ma.half_width.to_bits(), mb.half_width.to_bits());
            }
        }
    }
}
