//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `S(θ) = Σ (y_i − f(x_i, θ))²` for any [`Model`]. Each iteration:
//!
//! 1. evaluate residuals `r` and the Jacobian `J = ∂f/∂θ` at the current θ
//! 2. solve the damped normal equations `(JᵗJ + λI) Δθ = Jᵗr`
//! 3. accept `θ + Δθ` if it lowers `S` (and shrink λ), otherwise grow λ and
//!    retry, up to `max_rejections` times
//!
//! A run moves through `Initialized → Iterating → {Converged,
//! MaxIterationsReached, Diverged}`. Only `Diverged` is an error; hitting the
//! iteration ceiling is reported through [`FitStatus::MaxIterationsReached`].
//!
//! Damping schedule follows the usual Nielsen/Gavin choices: `λ0 = τ·max(diag JᵗJ)`,
//! divide by 9 on acceptance and multiply by 11 on rejection.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, warn};

use crate::domain::{Dataset, FitKind, FitQuality, FitResult, FitStatus};
use crate::error::FitError;
use crate::fit::diagnostics::{r_squared_from_sums, rmse_from_sse, total_sum_of_squares};
use crate::math::{at_b, gram, inverse, solve_symmetric, symmetrize};
use crate::models::{Model, check_shapes};

/// Lower bound for λ relative to the initial curvature scale.
const LAMBDA_FLOOR_REL: f64 = 1e-15;

/// Sums of squares below `SSE_FLOOR_REL · Σy²` are round-off, not signal.
const SSE_FLOOR_REL: f64 = 1e-24;

/// Optimizer settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    /// Iteration ceiling; the only timeout-like control.
    pub max_iterations: usize,
    /// Rejected trial steps allowed within one iteration before giving up.
    pub max_rejections: usize,
    /// Stop when the accepted step lowers `S` by at most `ftol · S`.
    pub ftol: f64,
    /// Stop when `‖Δθ‖ ≤ xtol · (‖θ‖ + xtol)`.
    pub xtol: f64,
    /// Stop when every Jacobian column is within `gtol` (cosine) of orthogonal to `r`.
    pub gtol: f64,
    /// Initial damping as a fraction of `max(diag JᵗJ)`.
    pub lambda_init: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
    /// Damping ceiling as a multiple of `max(diag JᵗJ)`; exceeding it is divergence.
    pub lambda_max: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            max_rejections: 12,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            lambda_init: 1e-3,
            lambda_up: 11.0,
            lambda_down: 9.0,
            lambda_max: 1e12,
        }
    }
}

impl LmOptions {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn validate(&self) -> Result<(), FitError> {
        if self.max_iterations == 0 {
            return Err(FitError::InvalidInput("max_iterations must be >= 1".to_string()));
        }
        for (name, v) in [("ftol", self.ftol), ("xtol", self.xtol), ("gtol", self.gtol)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(FitError::InvalidInput(format!("{name} must be finite and >= 0, got {v}")));
            }
        }
        if !(self.lambda_init.is_finite() && self.lambda_init > 0.0) {
            return Err(FitError::InvalidInput("lambda_init must be > 0".to_string()));
        }
        if !(self.lambda_up > 1.0 && self.lambda_down > 1.0) {
            return Err(FitError::InvalidInput("lambda_up and lambda_down must be > 1".to_string()));
        }
        if !(self.lambda_max > self.lambda_init) {
            return Err(FitError::InvalidInput("lambda_max must exceed lambda_init".to_string()));
        }
        Ok(())
    }
}

/// Optimizer state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LmState {
    Initialized,
    Iterating,
    Converged,
    MaxIterationsReached,
    Diverged,
}

enum StepOutcome {
    Accepted {
        theta: DVector<f64>,
        residuals: DVector<f64>,
        sse: f64,
        step_norm: f64,
    },
    /// No acceptable step, but the residuals or the gradient are already at round-off level.
    Stalled,
    Rejected(String),
}

/// Working set for one fit call. Owned exclusively for the duration of the call.
struct Workspace<'a> {
    data: &'a Dataset,
    model: &'a dyn Model,
    options: &'a LmOptions,
    theta: DVector<f64>,
    residuals: DVector<f64>,
    jacobian: DMatrix<f64>,
    sse: f64,
    lambda: f64,
    lambda_floor: f64,
    lambda_ceiling: f64,
    sse_floor: f64,
}

/// Fit `model` to `data` starting from `initial_guess`.
pub fn fit_nonlinear(
    data: &Dataset,
    model: &dyn Model,
    initial_guess: &[f64],
    options: &LmOptions,
) -> Result<FitResult, FitError> {
    options.validate()?;

    let p = model.param_count();
    if initial_guess.len() != p {
        return Err(FitError::InvalidInput(format!(
            "initial guess has {} values, model '{}' has {p} parameters",
            initial_guess.len(),
            model.name()
        )));
    }
    if initial_guess.iter().any(|v| !v.is_finite()) {
        return Err(FitError::InvalidInput("initial guess contains non-finite values".to_string()));
    }
    check_shapes(model, data.dim(), p)?;
    let n = data.len();
    if n <= p {
        return Err(FitError::InsufficientData { needed: p + 1, got: n });
    }

    let mut state = LmState::Initialized;
    let theta = DVector::from_column_slice(initial_guess);
    let residuals = residual_vector(data, model, theta.as_slice());
    let sse = residuals.norm_squared();
    let jacobian = jacobian_matrix(data, model, theta.as_slice());
    if !sse.is_finite() || jacobian.iter().any(|v| !v.is_finite()) {
        return Err(FitError::OptimizationDiverged {
            iterations: 0,
            reason: "model is not finite at the initial guess".to_string(),
        });
    }

    let scale = max_diagonal(&gram(&jacobian)).max(f64::MIN_POSITIVE);
    let mut ws = Workspace {
        data,
        model,
        options,
        theta,
        residuals,
        jacobian,
        sse,
        lambda: options.lambda_init * scale,
        lambda_floor: LAMBDA_FLOOR_REL * scale,
        lambda_ceiling: options.lambda_max * scale,
        sse_floor: SSE_FLOOR_REL * data.responses().map(|y| y * y).sum::<f64>(),
    };

    let mut iterations = 0usize;
    debug_assert_eq!(state, LmState::Initialized);
    state = LmState::Iterating;

    while state == LmState::Iterating {
        let g = at_b(&ws.jacobian, &ws.residuals);
        if ws.sse == 0.0 || gradient_cosine(&ws.jacobian, &g, ws.sse) <= options.gtol {
            state = LmState::Converged;
            break;
        }
        if iterations >= options.max_iterations {
            state = LmState::MaxIterationsReached;
            break;
        }
        iterations += 1;

        let sse_before = ws.sse;
        let theta_norm = ws.theta.norm();
        match ws.try_step(&g) {
            StepOutcome::Accepted {
                theta,
                residuals,
                sse,
                step_norm,
            } => {
                ws.jacobian = jacobian_matrix(data, model, theta.as_slice());
                ws.theta = theta;
                ws.residuals = residuals;
                ws.sse = sse;
                debug!(iteration = iterations, sse, lambda = ws.lambda, "lm step accepted");

                if ws.jacobian.iter().any(|v| !v.is_finite()) {
                    state = LmState::Diverged;
                    return Err(diverged(state, iterations, "Jacobian became non-finite".to_string()));
                }
                let small_decrease = sse_before - sse <= options.ftol * sse_before;
                let small_step = step_norm <= options.xtol * (theta_norm + options.xtol);
                if small_decrease || small_step {
                    state = LmState::Converged;
                }
            }
            StepOutcome::Stalled => {
                debug!(iteration = iterations, sse = ws.sse, "lm stalled at a stationary point");
                state = LmState::Converged;
            }
            StepOutcome::Rejected(reason) => {
                state = LmState::Diverged;
                return Err(diverged(state, iterations, reason));
            }
        }
    }

    let status = match state {
        LmState::Converged => FitStatus::Converged,
        LmState::MaxIterationsReached => {
            warn!(iterations, sse = ws.sse, model = model.name(), "lm reached the iteration ceiling");
            FitStatus::MaxIterationsReached
        }
        other => unreachable!("optimizer left the loop in state {other:?}"),
    };

    let sigma2 = ws.sse / (n - p) as f64;
    let mut covariance = match inverse(&gram(&ws.jacobian)) {
        Ok(inv) => inv * sigma2,
        Err(FitError::SingularMatrix) => return Err(FitError::IllConditionedFit),
        Err(e) => return Err(e),
    };
    symmetrize(&mut covariance);

    let quality = FitQuality {
        sse: ws.sse,
        r_squared: r_squared_from_sums(ws.sse, total_sum_of_squares(data)),
        rmse: rmse_from_sse(ws.sse, n),
        n,
    };
    info!(
        model = model.name(),
        iterations,
        sse = quality.sse,
        r_squared = quality.r_squared,
        ?status,
        "nonlinear fit finished"
    );

    Ok(FitResult::new(
        FitKind::Nonlinear,
        model.name(),
        ws.theta.iter().copied().collect(),
        covariance,
        quality,
        iterations,
        status,
    ))
}

impl Workspace<'_> {
    /// Search λ for a step that lowers the sum of squares.
    fn try_step(&mut self, g: &DVector<f64>) -> StepOutcome {
        let jtj = gram(&self.jacobian);
        let p = jtj.nrows();

        for _ in 0..=self.options.max_rejections {
            let mut damped = jtj.clone();
            for i in 0..p {
                damped[(i, i)] += self.lambda;
            }

            if let Ok(delta) = solve_symmetric(&damped, g) {
                let theta = &self.theta + &delta;
                let residuals = residual_vector(self.data, self.model, theta.as_slice());
                let sse = residuals.norm_squared();
                if sse.is_finite() && sse < self.sse {
                    self.lambda = (self.lambda / self.options.lambda_down).max(self.lambda_floor);
                    return StepOutcome::Accepted {
                        step_norm: delta.norm(),
                        theta,
                        residuals,
                        sse,
                    };
                }
            }

            self.lambda *= self.options.lambda_up;
            if self.lambda > self.lambda_ceiling {
                return self.no_descent(format!(
                    "damping exceeded its ceiling ({:.3e}) without an accepted step",
                    self.lambda_ceiling
                ));
            }
        }

        self.no_descent(format!(
            "{} consecutive trial steps increased the sum of squares",
            self.options.max_rejections + 1
        ))
    }

    fn no_descent(&self, reason: String) -> StepOutcome {
        if self.sse <= self.sse_floor {
            return StepOutcome::Stalled;
        }
        let g = at_b(&self.jacobian, &self.residuals);
        if gradient_cosine(&self.jacobian, &g, self.sse) <= self.options.ftol.sqrt() {
            StepOutcome::Stalled
        } else {
            StepOutcome::Rejected(reason)
        }
    }
}

fn diverged(state: LmState, iterations: usize, reason: String) -> FitError {
    debug_assert_eq!(state, LmState::Diverged);
    warn!(iterations, %reason, "lm diverged");
    FitError::OptimizationDiverged { iterations, reason }
}

/// `r_i = y_i − f(x_i, θ)`.
fn residual_vector(data: &Dataset, model: &dyn Model, theta: &[f64]) -> DVector<f64> {
    DVector::from_iterator(
        data.len(),
        data.samples().iter().map(|s| s.y() - model.predict(s.x(), theta)),
    )
}

/// `J_ij = ∂f(x_i, θ)/∂θ_j`.
fn jacobian_matrix(data: &Dataset, model: &dyn Model, theta: &[f64]) -> DMatrix<f64> {
    let p = theta.len();
    let mut jac = DMatrix::<f64>::zeros(data.len(), p);
    let mut row = vec![0.0; p];
    for (i, s) in data.samples().iter().enumerate() {
        model.jacobian_row(s.x(), theta, &mut row);
        for (j, &v) in row.iter().enumerate() {
            jac[(i, j)] = v;
        }
    }
    jac
}

fn max_diagonal(m: &DMatrix<f64>) -> f64 {
    m.diagonal().iter().copied().fold(0.0, f64::max)
}

/// `max_j |J_jᵗ r| / (‖J_j‖ ‖r‖)`; columns with zero norm are ignored.
fn gradient_cosine(jac: &DMatrix<f64>, g: &DVector<f64>, sse: f64) -> f64 {
    let r_norm = sse.sqrt();
    if r_norm == 0.0 {
        return 0.0;
    }
    jac.column_iter()
        .zip(g.iter())
        .filter_map(|(col, &gj)| {
            let c = col.norm();
            (c > 0.0).then(|| gj.abs() / (c * r_norm))
        })
        .fold(0.0, f64::max)
}
