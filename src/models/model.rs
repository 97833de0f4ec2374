//! Parametric model families.
//!
//! The solvers rely on two primitive operations:
//! - predict `ŷ = f(x, θ)` (for residuals and diagnostics)
//! - fill the Jacobian row `∂f/∂θ` at one sample (for Levenberg–Marquardt)
//!
//! Built-ins provide analytic Jacobians; user models may supply one or fall
//! back to central finite differences.

use std::fmt;
use std::sync::Arc;

use crate::error::FitError;

/// A differentiable scalar model `f(x, θ)`.
pub trait Model: Send + Sync {
    /// Identifier used in reports.
    fn name(&self) -> &str;

    /// Number of free parameters.
    fn param_count(&self) -> usize;

    /// Optional human-readable parameter labels (length `param_count`).
    fn param_names(&self) -> Vec<String> {
        (0..self.param_count()).map(|i| format!("p{i}")).collect()
    }

    /// Number of predictors `x` must carry, when the model fixes it.
    fn input_dim(&self) -> Option<usize> {
        None
    }

    /// Predicted response at predictor `x`.
    fn predict(&self, x: &[f64], theta: &[f64]) -> f64;

    /// Write `∂f/∂θ_j` at `x` into `out[j]`.
    fn jacobian_row(&self, x: &[f64], theta: &[f64], out: &mut [f64]) {
        finite_difference_row(self, x, theta, out);
    }
}

/// Reject predictor or parameter shapes the model cannot evaluate.
pub fn check_shapes(model: &dyn Model, dim: usize, theta_len: usize) -> Result<(), FitError> {
    if let Some(expected) = model.input_dim().filter(|&d| d != dim) {
        return Err(FitError::InvalidInput(format!(
            "model '{}' expects {expected} predictor(s), data has {dim}",
            model.name()
        )));
    }
    if theta_len != model.param_count() {
        return Err(FitError::InvalidInput(format!(
            "model '{}' has {} parameters, got {theta_len}",
            model.name(),
            model.param_count()
        )));
    }
    Ok(())
}

/// Relative step for central differences (≈ cube root of machine epsilon).
const FD_REL_STEP: f64 = 6.055_454_452_393_343e-6;

/// Central-difference Jacobian row.
///
/// The step for parameter `j` is `FD_REL_STEP · max(|θ_j|, 1)`.
pub fn finite_difference_row<M: Model + ?Sized>(model: &M, x: &[f64], theta: &[f64], out: &mut [f64]) {
    let mut work = theta.to_vec();
    for j in 0..theta.len() {
        let h = FD_REL_STEP * theta[j].abs().max(1.0);
        work[j] = theta[j] + h;
        let up = model.predict(x, &work);
        work[j] = theta[j] - h;
        let down = model.predict(x, &work);
        work[j] = theta[j];
        out[j] = (up - down) / (2.0 * h);
    }
}

/// `θ0 + Σ θ_j x_j`, the model behind ordinary least squares (intercept first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearModel {
    pub predictors: usize,
}

impl Model for LinearModel {
    fn name(&self) -> &str {
        "linear"
    }

    fn param_count(&self) -> usize {
        self.predictors + 1
    }

    fn param_names(&self) -> Vec<String> {
        std::iter::once("const".to_string())
            .chain((1..=self.predictors).map(|j| format!("x{j}")))
            .collect()
    }

    fn input_dim(&self) -> Option<usize> {
        Some(self.predictors)
    }

    fn predict(&self, x: &[f64], theta: &[f64]) -> f64 {
        theta[0] + x.iter().zip(&theta[1..]).map(|(xi, b)| xi * b).sum::<f64>()
    }

    fn jacobian_row(&self, x: &[f64], _theta: &[f64], out: &mut [f64]) {
        out[0] = 1.0;
        out[1..].copy_from_slice(x);
    }
}

/// Saturating exponential `a·(1 − e^{−b·x}) + c` of a single predictor.
///
/// Parameters are `[a, b, c]`: `a` is the asymptotic gain, `b` the rate and `c`
/// the level at `x = 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaturatingExponential;

impl Model for SaturatingExponential {
    fn name(&self) -> &str {
        "saturating_exponential"
    }

    fn param_count(&self) -> usize {
        3
    }

    fn param_names(&self) -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    fn input_dim(&self) -> Option<usize> {
        Some(1)
    }

    fn predict(&self, x: &[f64], theta: &[f64]) -> f64 {
        let (a, b, c) = (theta[0], theta[1], theta[2]);
        // 1 - exp(-bx) computed as -expm1(-bx) to keep precision for small bx.
        a * -(-b * x[0]).exp_m1() + c
    }

    fn jacobian_row(&self, x: &[f64], theta: &[f64], out: &mut [f64]) {
        let (a, b) = (theta[0], theta[1]);
        let e = (-b * x[0]).exp();
        out[0] = -(-b * x[0]).exp_m1();
        out[1] = a * x[0] * e;
        out[2] = 1.0;
    }
}

type PredictFn = dyn Fn(&[f64], &[f64]) -> f64 + Send + Sync;
type JacobianFn = dyn Fn(&[f64], &[f64], &mut [f64]) + Send + Sync;

/// A user-supplied model built from closures.
pub struct FnModel {
    name: String,
    param_count: usize,
    input_dim: Option<usize>,
    predict: Box<PredictFn>,
    jacobian: Option<Box<JacobianFn>>,
}

impl FnModel {
    /// Model with a finite-difference Jacobian.
    pub fn new<F>(name: impl Into<String>, param_count: usize, predict: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            param_count,
            input_dim: None,
            predict: Box::new(predict),
            jacobian: None,
        }
    }

    /// Attach an analytic Jacobian row rule.
    pub fn with_jacobian<J>(mut self, jacobian: J) -> Self
    where
        J: Fn(&[f64], &[f64], &mut [f64]) + Send + Sync + 'static,
    {
        self.jacobian = Some(Box::new(jacobian));
        self
    }

    /// Require exactly `dim` predictors per sample.
    pub fn with_input_dim(mut self, dim: usize) -> Self {
        self.input_dim = Some(dim);
        self
    }
}

impl fmt::Debug for FnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModel")
            .field("name", &self.name)
            .field("param_count", &self.param_count)
            .field("input_dim", &self.input_dim)
            .field("analytic_jacobian", &self.jacobian.is_some())
            .finish()
    }
}

impl Model for FnModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn param_count(&self) -> usize {
        self.param_count
    }

    fn input_dim(&self) -> Option<usize> {
        self.input_dim
    }

    fn predict(&self, x: &[f64], theta: &[f64]) -> f64 {
        (self.predict)(x, theta)
    }

    fn jacobian_row(&self, x: &[f64], theta: &[f64], out: &mut [f64]) {
        match &self.jacobian {
            Some(jac) => jac(x, theta, out),
            None => finite_difference_row(self, x, theta, out),
        }
    }
}

/// What to fit: the closed-form linear family or an iterative nonlinear one.
#[derive(Clone)]
pub enum ModelSpec {
    /// Intercept plus one slope per predictor; dimensionality comes from the data.
    Linear,
    /// Arbitrary differentiable model plus its required starting point.
    Nonlinear {
        model: Arc<dyn Model>,
        initial_guess: Vec<f64>,
    },
}

impl ModelSpec {
    pub fn nonlinear(model: impl Model + 'static, initial_guess: Vec<f64>) -> Self {
        ModelSpec::Nonlinear {
            model: Arc::new(model),
            initial_guess,
        }
    }

    /// The saturating-exponential family with a starting point `[a, b, c]`.
    pub fn saturating_exponential(initial_guess: [f64; 3]) -> Self {
        Self::nonlinear(SaturatingExponential, initial_guess.to_vec())
    }

    /// Model used to evaluate predictions for data of dimensionality `dim`.
    pub fn model(&self, dim: usize) -> Arc<dyn Model> {
        match self {
            ModelSpec::Linear => Arc::new(LinearModel { predictors: dim }),
            ModelSpec::Nonlinear { model, .. } => Arc::clone(model),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ModelSpec::Linear => "linear",
            ModelSpec::Nonlinear { model, .. } => model.name(),
        }
    }
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSpec::Linear => f.write_str("Linear"),
            ModelSpec::Nonlinear { model, initial_guess } => f
                .debug_struct("Nonlinear")
                .field("model", &model.name())
                .field("initial_guess", initial_guess)
                .finish(),
        }
    }
}
