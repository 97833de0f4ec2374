//! Error types.
//!
//! - [`FitError`]: recoverable failures of the numerical engine. Each variant is
//!   a distinct outcome the caller can match on.
//! - [`AppError`]: what the `libstats` binary reports (message + exit code).

use thiserror::Error;

/// Failure modes of the fitting / testing engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Malformed input: mismatched lengths, non-finite values, wrong guess length.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Fewer samples than the fit needs.
    #[error("insufficient data: need at least {needed} samples, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// A matrix was not invertible within tolerance.
    #[error("matrix is singular or too ill-conditioned to invert")]
    SingularMatrix,

    /// The model is not identifiable from the data at the fitted parameters.
    #[error("ill-conditioned fit: parameter covariance could not be estimated")]
    IllConditionedFit,

    /// Input for which the statistic is undefined (e.g. zero variance).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// Levenberg–Marquardt failed to find any descent step.
    #[error("optimization diverged after {iterations} iterations: {reason}")]
    OptimizationDiverged { iterations: usize, reason: String },
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match err {
            FitError::InvalidInput(_) => 2,
            FitError::InsufficientData { .. } => 3,
            _ => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_errors_map_to_exit_codes() {
        let e: AppError = FitError::InsufficientData { needed: 4, got: 2 }.into();
        assert_eq!(e.exit_code(), 3);
        assert!(e.to_string().contains("need at least 4"));

        let e: AppError = FitError::SingularMatrix.into();
        assert_eq!(e.exit_code(), 4);

        let e: AppError = FitError::InvalidInput("x".into()).into();
        assert_eq!(e.exit_code(), 2);
    }
}
