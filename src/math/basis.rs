//! Seasonal basis functions.
//!
//! Time is mapped onto the unit interval by its position in the calendar year,
//! and the seasonal cycle is expanded in a truncated Fourier series:
//!
//! - `t = (day_of_year - 1 + seconds_of_day / 86400) / days_in_year`
//! - harmonic `k` contributes `cos(2πkt)` and `sin(2πkt)`
//!
//! Using the actual year length keeps 31 December inside `[0, 1)` in leap years.

use std::f64::consts::TAU;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Fraction of the calendar year elapsed at `time`, in `[0, 1)`.
pub fn year_fraction(time: DateTime<Utc>) -> f64 {
    let day0 = f64::from(time.ordinal0());
    let secs = f64::from(time.num_seconds_from_midnight()) + f64::from(time.nanosecond()) * 1e-9;
    (day0 + secs / SECONDS_PER_DAY) / days_in_year(time.year())
}

/// Representative year fraction of calendar month `month` (1-based): its midpoint.
pub fn month_midpoint(month: u32) -> f64 {
    (f64::from(month) - 0.5) / 12.0
}

/// `(cos 2πkt, sin 2πkt)`.
pub fn harmonic_pair(t: f64, k: usize) -> (f64, f64) {
    let angle = TAU * k as f64 * t;
    (angle.cos(), angle.sin())
}

fn days_in_year(year: i32) -> f64 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366.0
    } else {
        365.0
    }
}
