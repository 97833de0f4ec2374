//! Goodness-of-fit metrics for any parameter vector.
//!
//! These are free functions over `(Dataset, Model, θ)` with no state, so they
//! can validate parameters that did not come from this crate at all. Shapes
//! are checked up front: a model that reads a different number of predictors
//! than the data carries, or a `θ` of the wrong length, is `InvalidInput`.

use crate::domain::{Dataset, FitQuality};
use crate::error::FitError;
use crate::models::{Model, check_shapes};

/// `y − ŷ` per sample.
pub fn residuals(data: &Dataset, model: &dyn Model, theta: &[f64]) -> Result<Vec<f64>, FitError> {
    check_shapes(model, data.dim(), theta.len())?;
    Ok(data
        .samples()
        .iter()
        .map(|s| s.y() - model.predict(s.x(), theta))
        .collect())
}

/// Sum of squared residuals.
pub fn sse(data: &Dataset, model: &dyn Model, theta: &[f64]) -> Result<f64, FitError> {
    check_shapes(model, data.dim(), theta.len())?;
    Ok(sum_of_squares(data, model, theta))
}

fn sum_of_squares(data: &Dataset, model: &dyn Model, theta: &[f64]) -> f64 {
    data.samples()
        .iter()
        .map(|s| {
            let r = s.y() - model.predict(s.x(), theta);
            r * r
        })
        .sum()
}

/// Total sum of squares around the response mean.
pub fn total_sum_of_squares(data: &Dataset) -> f64 {
    let mean = data.response_mean();
    data.responses().map(|y| (y - mean) * (y - mean)).sum()
}

/// `1 − SS_res / SS_tot`.
///
/// A constant response (`SS_tot = 0`) yields `1.0` when it is reproduced
/// exactly and `0.0` otherwise.
pub fn r_squared_from_sums(ss_res: f64, ss_tot: f64) -> f64 {
    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    }
}

/// `√(SS_res / n)`.
pub fn rmse_from_sse(ss_res: f64, n: usize) -> f64 {
    (ss_res / n as f64).sqrt()
}

pub fn r_squared(data: &Dataset, model: &dyn Model, theta: &[f64]) -> Result<f64, FitError> {
    Ok(r_squared_from_sums(sse(data, model, theta)?, total_sum_of_squares(data)))
}

pub fn rmse(data: &Dataset, model: &dyn Model, theta: &[f64]) -> Result<f64, FitError> {
    Ok(rmse_from_sse(sse(data, model, theta)?, data.len()))
}

/// All metrics in one pass over the data.
pub fn evaluate(data: &Dataset, model: &dyn Model, theta: &[f64]) -> Result<FitQuality, FitError> {
    let ss_res = sse(data, model, theta)?;
    Ok(FitQuality {
        sse: ss_res,
        r_squared: r_squared_from_sums(ss_res, total_sum_of_squares(data)),
        rmse: rmse_from_sse(ss_res, data.len()),
        n: data.len(),
    })
}

/// Relative agreement used by the facade's consistency check.
pub(crate) fn agrees(a: f64, b: f64, rel_tol: f64) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= rel_tol * a.abs().max(b.abs()).max(1.0)
}
