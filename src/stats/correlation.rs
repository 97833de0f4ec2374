//! Pearson correlation with a two-sided significance test.
//!
//! ```text
//! r = Σ(x−x̄)(y−ȳ) / √(Σ(x−x̄)² · Σ(y−ȳ)²)
//! t = r · √((n−2) / (1−r²)),   p = 2·P(T_{n−2} > |t|)
//! ```

use tracing::debug;

use crate::domain::{CorrelationResult, Dataset};
use crate::error::FitError;
use crate::fit::{LmOptions, fit};
use crate::models::ModelSpec;
use crate::stats::two_sided_t_p_value;

/// Least-squares line `y = intercept + slope · x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    pub intercept: f64,
    pub slope: f64,
}

impl TrendLine {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Pearson's r and its two-sided p-value.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<CorrelationResult, FitError> {
    let n = x.len();
    if n != y.len() {
        return Err(FitError::InvalidInput(format!(
            "sequences differ in length: {n} vs {}",
            y.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(FitError::InvalidInput(
            "sequences contain missing or non-finite values".to_string(),
        ));
    }
    if n < 3 {
        return Err(FitError::DegenerateInput(format!(
            "correlation needs at least 3 pairs, got {n}"
        )));
    }

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if is_constant(x) || sxx <= 0.0 {
        return Err(FitError::DegenerateInput("first sequence has zero variance".to_string()));
    }
    if is_constant(y) || syy <= 0.0 {
        return Err(FitError::DegenerateInput("second sequence has zero variance".to_string()));
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let df = (n - 2) as f64;
    let one_minus_r2 = 1.0 - r * r;
    let p_value = if one_minus_r2 <= 0.0 {
        0.0
    } else {
        two_sided_t_p_value(r * (df / one_minus_r2).sqrt(), df)
    };

    debug!(n, r, p_value, "pearson correlation");
    Ok(CorrelationResult { r, p_value, n })
}

/// Least-squares trend line through `(x, y)`, fitted through the facade.
pub fn trend_line(x: &[f64], y: &[f64]) -> Result<TrendLine, FitError> {
    let data = Dataset::univariate(x, y)?;
    let line = fit(&ModelSpec::Linear, &data, &LmOptions::default())?;
    let beta = line.parameters();
    Ok(TrendLine {
        intercept: beta[0],
        slope: beta[1],
    })
}

fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|&v| v == values[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn perfect_positive_and_negative() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let up: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
        let down: Vec<f64> = x.iter().map(|v| 10.0 - v).collect();

        let res = pearson(&x, &up).unwrap();
        assert_abs_diff_eq!(res.r, 1.0, epsilon = 1e-12);
        assert!(res.p_value < 1e-10);

        let res = pearson(&x, &down).unwrap();
        assert_abs_diff_eq!(res.r, -1.0, epsilon = 1e-12);
        assert!(res.p_value < 1e-10);
    }

    #[test]
    fn known_value() {
        // r = 0.8 exactly for this classic pair; t = 0.8·√(3/0.36) ≈ 2.309, p ≈ 0.104.
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 1.0, 4.0, 3.0, 5.0];
        let res = pearson(&x, &y).unwrap();
        assert_abs_diff_eq!(res.r, 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(res.p_value, 0.104, epsilon = 1e-3);
        assert_eq!(res.n, 5);
    }

    #[test]
    fn degenerate_inputs() {
        let x = [1.0, 2.0, 3.0];
        assert!(matches!(pearson(&x, &[4.0, 4.0, 4.0]), Err(FitError::DegenerateInput(_))));
        assert!(matches!(pearson(&[7.0; 4], &[1.0, 2.0, 3.0, 4.0]), Err(FitError::DegenerateInput(_))));
        assert!(matches!(pearson(&[1.0, 2.0], &[1.0, 2.0]), Err(FitError::DegenerateInput(_))));
        assert!(matches!(pearson(&x, &[1.0, 2.0]), Err(FitError::InvalidInput(_))));
    }

    #[test]
    fn trend_line_recovers_slope() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.5, 6.0, 8.5];
        let line = trend_line(&x, &y).unwrap();
        assert_abs_diff_eq!(line.slope, 2.5, epsilon = 1e-10);
        assert_abs_diff_eq!(line.intercept, 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(line.at(4.0), 11.0, epsilon = 1e-10);
    }

    #[test]
    fn trend_line_needs_more_points_than_parameters() {
        assert_eq!(
            trend_line(&[1.0, 2.0], &[3.0, 5.0]).unwrap_err(),
            FitError::InsufficientData { needed: 3, got: 2 }
        );
    }
}
