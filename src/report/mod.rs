//! Reporting utilities: fitted values, residual rankings and terminal formatting.

use crate::domain::{Dataset, FitResult};
use crate::error::AppError;
use crate::models::{Model, check_shapes};

pub mod format;

pub use format::*;

/// Observed vs. fitted value at one sample (first predictor as `x`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedPoint {
    pub x: f64,
    pub y_obs: f64,
    pub y_fit: f64,
    pub residual: f64,
}

/// Compute fitted values and residuals for each sample.
pub fn compute_fitted(data: &Dataset, model: &dyn Model, fit: &FitResult) -> Result<Vec<FittedPoint>, AppError> {
    check_shapes(model, data.dim(), fit.parameters().len())?;
    let mut out = Vec::with_capacity(data.len());
    for s in data.samples() {
        let y_fit = model.predict(s.x(), fit.parameters());
        if !y_fit.is_finite() {
            return Err(AppError::new(4, "Non-finite model prediction during residual computation."));
        }
        out.push(FittedPoint {
            x: s.x().first().copied().unwrap_or(0.0),
            y_obs: s.y(),
            y_fit,
            residual: s.y() - y_fit,
        });
    }
    Ok(out)
}

/// The `top_n` samples with the largest absolute residual, largest first.
pub fn largest_residuals(points: &[FittedPoint], top_n: usize) -> Vec<FittedPoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| b.residual.abs().total_cmp(&a.residual.abs()));
    sorted.truncate(top_n);
    sorted
}
