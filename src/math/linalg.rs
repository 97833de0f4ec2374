//! Dense linear algebra used by every solver.
//!
//! All fitting routines reduce to small symmetric systems:
//!
//! ```text
//! (AᵗA) x = Aᵗb            ordinary least squares
//! (JᵗJ + λI) Δθ = Jᵗr      damped Gauss–Newton step
//! (AᵗA)⁻¹                  parameter covariance
//! ```
//!
//! Implementation choices:
//! - Matrices are tiny (a handful of parameters), so we pay for an SVD to get
//!   the reciprocal condition number before every solve/inverse. Anything below
//!   [`RCOND_TOL`] is reported as [`FitError::SingularMatrix`] instead of
//!   returning garbage.
//! - Solves go through Cholesky (the systems are symmetric positive definite in
//!   exact arithmetic) and fall back to LU when rounding breaks definiteness.

use nalgebra::{DMatrix, DVector};

use crate::error::FitError;

/// Smallest accepted ratio `σ_min / σ_max` of singular values.
pub const RCOND_TOL: f64 = 1e-13;

/// `AᵗA`.
pub fn gram(a: &DMatrix<f64>) -> DMatrix<f64> {
    a.tr_mul(a)
}

/// `Aᵗb`.
pub fn at_b(a: &DMatrix<f64>, b: &DVector<f64>) -> DVector<f64> {
    a.tr_mul(b)
}

/// Reciprocal condition number in the 2-norm (`0.0` for zero / non-finite matrices).
pub fn reciprocal_condition(m: &DMatrix<f64>) -> f64 {
    if m.is_empty() || m.iter().any(|v| !v.is_finite()) {
        return 0.0;
    }
    let sv = m.clone().svd(false, false).singular_values;
    let max = sv.max();
    let min = sv.min();
    if !(max.is_finite() && max > 0.0) {
        return 0.0;
    }
    min / max
}

fn check_invertible(m: &DMatrix<f64>) -> Result<(), FitError> {
    if m.is_empty() || !m.is_square() {
        return Err(FitError::InvalidInput(format!(
            "expected a non-empty square matrix, got {}x{}",
            m.nrows(),
            m.ncols()
        )));
    }
    if !(reciprocal_condition(m) > RCOND_TOL) {
        return Err(FitError::SingularMatrix);
    }
    Ok(())
}

/// Solve `M x = rhs` for a symmetric `M`.
pub fn solve_symmetric(m: &DMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>, FitError> {
    check_invertible(m)?;
    if rhs.len() != m.nrows() {
        return Err(FitError::InvalidInput(format!(
            "right-hand side has length {}, matrix has {} rows",
            rhs.len(),
            m.nrows()
        )));
    }

    let x = match m.clone().cholesky() {
        Some(chol) => chol.solve(rhs),
        None => m.clone().lu().solve(rhs).ok_or(FitError::SingularMatrix)?,
    };

    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(FitError::SingularMatrix)
    }
}

/// Invert a square matrix.
pub fn inverse(m: &DMatrix<f64>) -> Result<DMatrix<f64>, FitError> {
    check_invertible(m)?;
    let inv = m.clone().try_inverse().ok_or(FitError::SingularMatrix)?;
    if inv.iter().all(|v| v.is_finite()) {
        Ok(inv)
    } else {
        Err(FitError::SingularMatrix)
    }
}

/// Solve the normal equations `(AᵗA) x = Aᵗb` for a tall `A` (rows ≥ cols).
pub fn solve_normal_equations(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, FitError> {
    if a.nrows() < a.ncols() {
        return Err(FitError::InsufficientData {
            needed: a.ncols(),
            got: a.nrows(),
        });
    }
    if b.len() != a.nrows() {
        return Err(FitError::InvalidInput(format!(
            "response has length {}, design matrix has {} rows",
            b.len(),
            a.nrows()
        )));
    }
    solve_symmetric(&gram(a), &at_b(a, b))
}

/// Symmetrize in place: `(M + Mᵗ) / 2`. Inverses of symmetric matrices drift by rounding.
pub fn symmetrize(m: &mut DMatrix<f64>) {
    let n = m.nrows().min(m.ncols());
    for i in 0..n {
        for j in (i + 1)..n {
            let v = 0.5 * (m[(i, j)] + m[(j, i)]);
            m[(i, j)] = v;
            m[(j, i)] = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normal_equations_recover_exact_line() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let b = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let x = solve_normal_equations(&a, &b).unwrap();
        assert_abs_diff_eq!(x[0], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(x[1], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn collinear_columns_are_singular() {
        // Second column is exactly twice the first.
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        let b = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(solve_normal_equations(&a, &b), Err(FitError::SingularMatrix));
    }

    #[test]
    fn wide_matrix_is_under_determined() {
        let a = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let b = DVector::from_row_slice(&[1.0]);
        assert_eq!(
            solve_normal_equations(&a, &b),
            Err(FitError::InsufficientData { needed: 2, got: 1 })
        );
    }

    #[test]
    fn inverse_of_spd_matrix() {
        let m = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let inv = inverse(&m).unwrap();
        let id = &m * &inv;
        assert_abs_diff_eq!(id[(0, 0)], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(id[(0, 1)], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(id[(1, 1)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn inverse_rejects_zero_and_non_square() {
        assert_eq!(inverse(&DMatrix::zeros(2, 2)), Err(FitError::SingularMatrix));
        assert!(matches!(
            inverse(&DMatrix::zeros(2, 3)),
            Err(FitError::InvalidInput(_))
        ));
    }

    #[test]
    fn solve_symmetric_matches_inverse() {
        let m = DMatrix::from_row_slice(3, 3, &[6.0, 2.0, 1.0, 2.0, 5.0, 2.0, 1.0, 2.0, 4.0]);
        let rhs = DVector::from_row_slice(&[1.0, -2.0, 3.0]);
        let x = solve_symmetric(&m, &rhs).unwrap();
        let y = inverse(&m).unwrap() * &rhs;
        for i in 0..3 {
            assert_abs_diff_eq!(x[i], y[i], epsilon = 1e-12);
        }
    }
}
