//! Fitting engine.
//!
//! Responsibilities:
//!
//! - closed-form linear least squares (`ols`)
//! - Levenberg–Marquardt for arbitrary differentiable models (`lm`)
//! - goodness-of-fit diagnostics for any parameter vector (`diagnostics`)
//! - one dispatching entry point plus parallel batch fitting (`facade`)

pub mod diagnostics;
pub mod facade;
pub mod lm;
pub mod ols;

pub use facade::{FitJob, fit, fit_many};
pub use lm::{LmOptions, LmState, fit_nonlinear};
pub use ols::{design_matrix, fit_ols};
