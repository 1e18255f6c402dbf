//! Gross range estimation.
//!
//! Sensor bounds come from the vendor calibration range. User bounds are the
//! historical `mean ± k·std` of the values that fall inside the sensor bounds.
//! Values outside the sensor bounds are malfunctions and do not shape the
//! distribution.

use tracing::{debug, warn};

use crate::domain::{EstimatorConfig, GrossRangeSpec, SensorBounds};
use crate::error::{QcError, QcResult};
use crate::math::mean_std;

/// Compute sensor and user bounds for one parameter.
///
/// User bounds are never clamped into the sensor bounds; a user bound outside
/// them means the distribution is skewed and is logged, not corrected.
pub fn process_gross_range(
    values: &[f64],
    bounds: SensorBounds,
    config: &EstimatorConfig,
) -> QcResult<GrossRangeSpec> {
    validate(bounds, config)?;

    let kept: Vec<f64> = values.iter().copied().filter(|v| bounds.contains(*v)).collect();
    let (mu, sd) = mean_std(&kept).ok_or_else(|| {
        QcError::insufficient_data(format!(
            "no values inside sensor range ({}, {}) out of {}",
            bounds.min,
            bounds.max,
            values.len()
        ))
    })?;

    let k = config.sigma_multiplier;
    let spec = GrossRangeSpec {
        sensor_min: bounds.min,
        sensor_max: bounds.max,
        user_min: mu - k * sd,
        user_max: mu + k * sd,
    };
    debug!(n = kept.len(), mean = mu, std = sd, "gross range computed");

    if !spec.is_ordered() {
        warn!(
            "user range [{:.4}, {:.4}] extends past sensor range [{}, {}]; distribution is skewed",
            spec.user_min, spec.user_max, spec.sensor_min, spec.sensor_max
        );
    }

    Ok(spec)
}

pub(crate) fn validate(bounds: SensorBounds, config: &EstimatorConfig) -> QcResult<()> {
    if !(bounds.min.is_finite() && bounds.max.is_finite() && bounds.min < bounds.max) {
        return Err(QcError::invalid_input(format!(
            "invalid sensor bounds ({}, {})",
            bounds.min, bounds.max
        )));
    }
    if !(config.sigma_multiplier.is_finite() && config.sigma_multiplier >= 0.0) {
        return Err(QcError::invalid_input(format!(
            "invalid standard deviation multiplier {}",
            config.sigma_multiplier
        )));
    }
    Ok(())
}
