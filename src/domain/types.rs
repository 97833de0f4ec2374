//! Shared domain types.
//!
//! Inputs (`Sample`, `Dataset`) are validated once on construction and are
//! read-only afterwards. Outputs (`FitResult`, `CorrelationResult`) are fresh
//! records that never borrow from the input dataset.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::stats::{f_upper_p_value, two_sided_t_p_value};

/// One observation: predictor vector and observed response.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    x: Vec<f64>,
    y: f64,
}

impl Sample {
    pub fn new(x: Vec<f64>, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

/// An ordered, non-empty set of samples sharing one predictor dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    samples: Vec<Sample>,
    dim: usize,
}

impl Dataset {
    /// Validate and wrap samples.
    ///
    /// Fails on an empty set, inconsistent dimensionality or non-finite values.
    pub fn new(samples: Vec<Sample>) -> Result<Self, FitError> {
        let Some(first) = samples.first() else {
            return Err(FitError::InsufficientData { needed: 1, got: 0 });
        };
        let dim = first.x.len();

        for (i, s) in samples.iter().enumerate() {
            if s.x.len() != dim {
                return Err(FitError::InvalidInput(format!(
                    "sample {i} has {} predictors, expected {dim}",
                    s.x.len()
                )));
            }
            if !s.y.is_finite() || s.x.iter().any(|v| !v.is_finite()) {
                return Err(FitError::InvalidInput(format!(
                    "sample {i} contains a missing or non-finite value"
                )));
            }
        }

        Ok(Self { samples, dim })
    }

    /// One predictor per sample.
    pub fn univariate(x: &[f64], y: &[f64]) -> Result<Self, FitError> {
        Self::from_columns(&[x], y)
    }

    /// Build from predictor columns (all the same length as `y`).
    pub fn from_columns(columns: &[&[f64]], y: &[f64]) -> Result<Self, FitError> {
        if let Some(bad) = columns.iter().position(|c| c.len() != y.len()) {
            return Err(FitError::InvalidInput(format!(
                "predictor column {bad} has length {}, response has {}",
                columns[bad].len(),
                y.len()
            )));
        }
        let samples = y
            .iter()
            .enumerate()
            .map(|(i, &yi)| Sample::new(columns.iter().map(|c| c[i]).collect(), yi))
            .collect();
        Self::new(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Predictor dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn responses(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.y)
    }

    pub fn response_mean(&self) -> f64 {
        self.responses().sum::<f64>() / self.len() as f64
    }
}

/// Terminal state of a successful fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Converged,
    MaxIterationsReached,
}

/// Which solver produced a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitKind {
    Linear,
    Nonlinear,
}

/// Goodness-of-fit metrics for one parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub r_squared: f64,
    pub rmse: f64,
    pub n: usize,
}

/// One row of a coefficient table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterEstimate {
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
}

/// Overall significance test of a linear fit (all slopes zero).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FTest {
    pub statistic: f64,
    pub df_model: usize,
    pub df_resid: usize,
    pub p_value: f64,
}

/// Immutable outcome of one fit call.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    kind: FitKind,
    model_name: String,
    parameters: Vec<f64>,
    covariance: DMatrix<f64>,
    quality: FitQuality,
    iterations: usize,
    status: FitStatus,
}

impl FitResult {
    pub(crate) fn new(
        kind: FitKind,
        model_name: impl Into<String>,
        parameters: Vec<f64>,
        covariance: DMatrix<f64>,
        quality: FitQuality,
        iterations: usize,
        status: FitStatus,
    ) -> Self {
        debug_assert_eq!(covariance.nrows(), parameters.len());
        debug_assert_eq!(covariance.ncols(), parameters.len());
        Self {
            kind,
            model_name: model_name.into(),
            parameters,
            covariance,
            quality,
            iterations,
            status,
        }
    }

    pub fn kind(&self) -> FitKind {
        self.kind
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    /// Parameter covariance (symmetric, `p × p`).
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    pub fn quality(&self) -> FitQuality {
        self.quality
    }

    pub fn r_squared(&self) -> f64 {
        self.quality.r_squared
    }

    pub fn rmse(&self) -> f64 {
        self.quality.rmse
    }

    pub fn sse(&self) -> f64 {
        self.quality.sse
    }

    pub fn n(&self) -> usize {
        self.quality.n
    }

    /// Residual degrees of freedom `n − p`.
    pub fn dof(&self) -> usize {
        self.quality.n.saturating_sub(self.parameters.len())
    }

    /// `1 − (1 − R²)(n − 1)/(n − p)`.
    pub fn adjusted_r_squared(&self) -> f64 {
        let n = self.quality.n as f64;
        let dof = self.dof() as f64;
        if dof <= 0.0 {
            return f64::NAN;
        }
        1.0 - (1.0 - self.quality.r_squared) * (n - 1.0) / dof
    }

    /// Iterations taken (0 for closed-form fits).
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn status(&self) -> FitStatus {
        self.status
    }

    pub fn converged(&self) -> bool {
        self.status == FitStatus::Converged
    }

    /// Standard errors from the covariance diagonal.
    pub fn std_errors(&self) -> Vec<f64> {
        (0..self.parameters.len())
            .map(|i| self.covariance[(i, i)].max(0.0).sqrt())
            .collect()
    }

    /// Estimate, standard error, t-statistic and two-sided p-value per parameter.
    pub fn parameter_table(&self) -> Vec<ParameterEstimate> {
        let dof = self.dof() as f64;
        self.parameters
            .iter()
            .zip(self.std_errors())
            .map(|(&estimate, std_error)| {
                let t_value = estimate / std_error;
                ParameterEstimate {
                    estimate,
                    std_error,
                    t_value,
                    p_value: two_sided_t_p_value(t_value, dof),
                }
            })
            .collect()
    }

    /// Overall F-test; only defined for linear fits with at least one slope.
    pub fn f_test(&self) -> Option<FTest> {
        if self.kind != FitKind::Linear || self.parameters.len() < 2 {
            return None;
        }
        let df_model = self.parameters.len() - 1;
        let df_resid = self.dof();
        if df_resid == 0 {
            return None;
        }
        let r2 = self.quality.r_squared;
        let statistic = (r2 / df_model as f64) / ((1.0 - r2) / df_resid as f64);
        Some(FTest {
            statistic,
            df_model,
            df_resid,
            p_value: f_upper_p_value(statistic, df_model as f64, df_resid as f64),
        })
    }
}

/// Pearson correlation with its two-sided significance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Correlation coefficient in `[-1, 1]`.
    pub r: f64,
    /// Two-sided p-value in `[0, 1]`.
    pub p_value: f64,
    pub n: usize,
}

/// Fitted curve sampled on an even grid over the observed predictor range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Portable JSON form of a fit, written by `--export-fit` and read by `libstats plot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub model: String,
    pub kind: FitKind,
    pub param_names: Vec<String>,
    pub parameters: Vec<f64>,
    pub std_errors: Vec<f64>,
    /// Row-major `p × p` covariance.
    pub covariance: Vec<Vec<f64>>,
    pub quality: FitQuality,
    pub iterations: usize,
    pub status: FitStatus,
    /// Present for single-predictor models only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<FitGrid>,
}

/// A run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Samples per generated dataset.
    pub n: usize,
    /// Number of generated search queries.
    pub queries: usize,
    pub seed: u64,
    pub top_n: usize,

    pub initial_guess: Vec<f64>,
    pub max_iterations: usize,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_csv: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_rejects_empty_and_ragged_input() {
        assert_eq!(
            Dataset::new(Vec::new()),
            Err(FitError::InsufficientData { needed: 1, got: 0 })
        );

        let ragged = vec![Sample::new(vec![1.0], 1.0), Sample::new(vec![1.0, 2.0], 2.0)];
        assert!(matches!(Dataset::new(ragged), Err(FitError::InvalidInput(_))));
    }

    #[test]
    fn dataset_rejects_missing_values() {
        let err = Dataset::univariate(&[1.0, f64::NAN], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
        let err = Dataset::univariate(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
    }

    #[test]
    fn from_columns_builds_rows() {
        let d = Dataset::from_columns(&[&[1.0, 2.0], &[3.0, 4.0]], &[5.0, 6.0]).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.dim(), 2);
        assert_eq!(d.samples()[1].x(), &[2.0, 4.0]);
        assert_eq!(d.response_mean(), 5.5);
    }

    #[test]
    fn parameter_table_uses_covariance_diagonal() {
        let fit = FitResult::new(
            FitKind::Linear,
            "linear",
            vec![2.0, 0.5],
            DMatrix::from_row_slice(2, 2, &[0.25, 0.0, 0.0, 0.01]),
            FitQuality { sse: 1.0, r_squared: 0.9, rmse: 0.1, n: 12 },
            0,
            FitStatus::Converged,
        );
        let table = fit.parameter_table();
        assert!((table[0].std_error - 0.5).abs() < 1e-12);
        assert!((table[0].t_value - 4.0).abs() < 1e-12);
        assert!((table[1].std_error - 0.1).abs() < 1e-12);
        assert!(table[0].p_value > 0.0 && table[0].p_value < 0.01);

        let f = fit.f_test().unwrap();
        assert_eq!(f.df_model, 1);
        assert_eq!(f.df_resid, 10);
        assert!((f.statistic - 90.0).abs() < 1e-9);
        assert!((fit.adjusted_r_squared() - (1.0 - 0.1 * 11.0 / 10.0)).abs() < 1e-12);
    }
}
