//! Harmonic seasonal model.
//!
//! ```text
//! y(t) = a0 + Σ_{k=1..K} [a_k cos(2πkt) + b_k sin(2πkt)]
//! ```
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a given year fraction (for OLS)
//! - predict y(t) given coefficients (for residuals and monthly centres)
//!
//! Coefficients are stored as `[a0, a1, b1, a2, b2, ...]`.

use crate::math::harmonic_pair;

/// Number of coefficients for harmonic order `order`.
pub fn coefficient_len(order: usize) -> usize {
    1 + 2 * order
}

/// Fill a design row for year fraction `t`.
///
/// The row includes the constant term first (intercept).
///
/// # Panics
/// Panics if `out` does not have length `coefficient_len(order)`. Callers should
/// size the row correctly.
pub fn fill_design_row(order: usize, t: f64, out: &mut [f64]) {
    assert_eq!(out.len(), coefficient_len(order), "design row length mismatch");
    out[0] = 1.0;
    for k in 1..=order {
        let (c, s) = harmonic_pair(t, k);
        out[2 * k - 1] = c;
        out[2 * k] = s;
    }
}

/// Predict `y(t)` from fitted coefficients.
pub fn predict(coefficients: &[f64], t: f64) -> f64 {
    let order = (coefficients.len().saturating_sub(1)) / 2;
    let mut y = coefficients.first().copied().unwrap_or(0.0);
    for k in 1..=order {
        let (c, s) = harmonic_pair(t, k);
        y += coefficients[2 * k - 1] * c + coefficients[2 * k] * s;
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn design_row_matches_predict() {
        let coefficients = [10.0, 2.0, -1.0, 0.5, 0.25];
        let mut row = vec![0.0; coefficient_len(2)];
        for &t in &[0.0, 0.13, 0.5, 0.87] {
            fill_design_row(2, t, &mut row);
            let dot: f64 = row.iter().zip(coefficients.iter()).map(|(a, b)| a * b).sum();
            assert!((dot - predict(&coefficients, t)).abs() < 1e-12);
        }
    }

    #[test]
    fn intercept_only_model_is_flat() {
        assert_eq!(predict(&[4.2], 0.3), 4.2);
        assert_eq!(coefficient_len(0), 1);
    }
}
