//! Closed-form multivariate linear least squares.
//!
//! ```text
//! X = [1 | x_1 … x_k]      (n × (k+1), intercept first)
//! β = (XᵗX)⁻¹ Xᵗy
//! Cov(β) = σ̂² (XᵗX)⁻¹,     σ̂² = SS_res / (n − k − 1)
//! ```

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::{Dataset, FitKind, FitResult, FitStatus};
use crate::error::FitError;
use crate::fit::diagnostics::evaluate;
use crate::math::{gram, inverse, solve_normal_equations, symmetrize};
use crate::models::LinearModel;

/// Build the design matrix with a leading intercept column.
pub fn design_matrix(data: &Dataset) -> DMatrix<f64> {
    let n = data.len();
    let p = data.dim() + 1;
    let mut x = DMatrix::<f64>::zeros(n, p);
    for (i, s) in data.samples().iter().enumerate() {
        x[(i, 0)] = 1.0;
        for (j, &v) in s.x().iter().enumerate() {
            x[(i, j + 1)] = v;
        }
    }
    x
}

/// Fit `y = β0 + Σ βj xj` by ordinary least squares.
///
/// Fails with `InsufficientData` when `n ≤ k + 1` and with `SingularMatrix`
/// when the predictors are collinear.
pub fn fit_ols(data: &Dataset) -> Result<FitResult, FitError> {
    let n = data.len();
    let p = data.dim() + 1;
    if n <= p {
        return Err(FitError::InsufficientData { needed: p + 1, got: n });
    }

    let x = design_matrix(data);
    let y = DVector::from_iterator(n, data.responses());

    let beta = solve_normal_equations(&x, &y)?;

    // Residuals go through the same per-sample prediction as the diagnostics.
    let model = LinearModel { predictors: data.dim() };
    let quality = evaluate(data, &model, beta.as_slice())?;

    let sigma2 = quality.sse / (n - p) as f64;
    let mut covariance = inverse(&gram(&x))? * sigma2;
    symmetrize(&mut covariance);
    debug!(n, p, r_squared = quality.r_squared, rmse = quality.rmse, "ols fit");

    Ok(FitResult::new(
        FitKind::Linear,
        "linear",
        beta.iter().copied().collect(),
        covariance,
        quality,
        0,
        FitStatus::Converged,
    ))
}
