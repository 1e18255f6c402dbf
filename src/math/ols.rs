//! Ordinary least squares solver.
//!
//! The climatology fit solves one small regression per series (and per depth
//! bin):
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - SVD handles the tall design matrix (many samples, 2K+1 columns).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - A pseudo-inverse would quietly zero out unidentifiable coefficients, so the
//!   numerical rank is checked first and a deficient design is an error.

use nalgebra::{DMatrix, DVector};

use crate::error::{QcError, QcResult};

/// Relative singular-value cutoff for the rank test.
///
/// Samples confined to a few hours of the year give ratios around 1e-9; the
/// fitted cycle is then pure extrapolation and is treated as rank deficient.
const RANK_RTOL: f64 = 1e-8;

/// Solve a least squares problem using SVD.
///
/// Returns `SingularFit` if the design matrix does not have full column rank.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> QcResult<DVector<f64>> {
    let (n, p) = x.shape();
    if n != y.len() {
        return Err(QcError::invalid_input(format!(
            "design matrix has {n} rows but {} observations",
            y.len()
        )));
    }
    if n < p {
        return Err(QcError::SingularFit { n, rank: n, params: p });
    }

    let svd = x.clone().svd(true, true);
    let sv_max = svd.singular_values.max();
    let tol = (sv_max * RANK_RTOL).max(f64::MIN_POSITIVE);
    let rank = svd.rank(tol);
    if rank < p {
        return Err(QcError::SingularFit { n, rank, params: p });
    }

    let beta = svd
        .solve(y, tol)
        .map_err(|e| QcError::invalid_input(format!("SVD solve failed: {e}")))?;
    if beta.iter().all(|v| v.is_finite()) {
        Ok(beta)
    } else {
        Err(QcError::SingularFit { n, rank, params: p })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn collinear_columns_are_rejected() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[1.0, 1.0, 1.0]);

        let err = solve_least_squares(&x, &y).unwrap_err();
        assert!(matches!(err, QcError::SingularFit { rank: 1, params: 2, .. }));
    }

    #[test]
    fn underdetermined_system_is_rejected() {
        let x = DMatrix::from_row_slice(1, 2, &[1.0, 0.5]);
        let y = DVector::from_row_slice(&[1.0]);
        assert!(matches!(
            solve_least_squares(&x, &y),
            Err(QcError::SingularFit { n: 1, .. })
        ));
    }
}
