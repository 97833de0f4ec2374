//! Single entry point for fitting any supported model family.
//!
//! `fit` dispatches on the [`ModelSpec`] tag:
//!
//! - `Linear` goes to the closed-form OLS solver
//! - `Nonlinear` goes to Levenberg–Marquardt from the supplied initial guess
//!
//! and then re-derives R² and RMSE from the fitted parameters with the
//! standalone diagnostics. The solver's own bookkeeping and the diagnostics
//! must agree; a disagreement is a bug in this crate, not a property of the data.

use rayon::prelude::*;
use tracing::{debug, info_span};

use crate::domain::{Dataset, FitResult};
use crate::error::FitError;
use crate::fit::diagnostics::{agrees, evaluate};
use crate::fit::lm::{LmOptions, fit_nonlinear};
use crate::fit::ols::fit_ols;
use crate::models::ModelSpec;

/// Relative tolerance for the solver/diagnostics agreement check.
const CONSISTENCY_REL_TOL: f64 = 1e-8;

/// Fit `spec` to `data`.
///
/// Errors come straight from the underlying solver; nothing is retried.
pub fn fit(spec: &ModelSpec, data: &Dataset, options: &LmOptions) -> Result<FitResult, FitError> {
    let _span = info_span!("fit", model = spec.name(), n = data.len()).entered();

    let result = match spec {
        ModelSpec::Linear => fit_ols(data)?,
        ModelSpec::Nonlinear { model, initial_guess } => {
            fit_nonlinear(data, model.as_ref(), initial_guess, options)?
        }
    };

    let model = spec.model(data.dim());
    let check = evaluate(data, model.as_ref(), result.parameters())?;
    assert!(
        agrees(check.r_squared, result.r_squared(), CONSISTENCY_REL_TOL)
            && agrees(check.rmse, result.rmse(), CONSISTENCY_REL_TOL),
        "solver and diagnostics disagree for '{}': r2 {} vs {}, rmse {} vs {}",
        spec.name(),
        result.r_squared(),
        check.r_squared,
        result.rmse(),
        check.rmse,
    );
    debug!(r_squared = check.r_squared, rmse = check.rmse, "diagnostics agree");

    Ok(result)
}

/// One independent unit of work for [`fit_many`].
#[derive(Debug, Clone)]
pub struct FitJob {
    pub spec: ModelSpec,
    pub dataset: Dataset,
}

impl FitJob {
    pub fn new(spec: ModelSpec, dataset: Dataset) -> Self {
        Self { spec, dataset }
    }
}

/// Fit independent jobs in parallel.
///
/// Jobs share nothing, so each runs on its own rayon task; results come back
/// in the order of `jobs`.
pub fn fit_many(jobs: &[FitJob], options: &LmOptions) -> Vec<Result<FitResult, FitError>> {
    jobs.par_iter()
        .map(|job| fit(&job.spec, &job.dataset, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitKind, FitStatus};
    use crate::fit::diagnostics;
    use crate::models::{LinearModel, Model, SaturatingExponential};
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal, Uniform};

    fn line(n: usize) -> Dataset {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 4.0 - 0.5 * v + if (*v as usize) % 2 == 0 { 0.1 } else { -0.1 }).collect();
        Dataset::univariate(&x, &y).unwrap()
    }

    fn saturation() -> Dataset {
        let x: Vec<f64> = (1..=80).map(f64::from).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&v| SaturatingExponential.predict(&[v], &[200.0, 0.05, 10.0]) + 3.0 * (v * 1.3).sin())
            .collect();
        Dataset::univariate(&x, &y).unwrap()
    }

    #[test]
    fn linear_spec_dispatches_to_ols() {
        let fit = fit(&ModelSpec::Linear, &line(20), &LmOptions::default()).unwrap();
        assert_eq!(fit.kind(), FitKind::Linear);
        assert_eq!(fit.iterations(), 0);
        assert_abs_diff_eq!(fit.parameters()[1], -0.5, epsilon = 0.01);
    }

    #[test]
    fn nonlinear_spec_dispatches_to_lm() {
        let spec = ModelSpec::saturating_exponential([150.0, 0.03, 5.0]);
        let fit = fit(&spec, &saturation(), &LmOptions::default()).unwrap();
        assert_eq!(fit.kind(), FitKind::Nonlinear);
        assert_eq!(fit.status(), FitStatus::Converged);
        assert!(fit.iterations() > 0);
        assert!(fit.r_squared() > 0.95);
    }

    /// Three predictors, response `level + N(0, σ)`: almost all of `y` is offset.
    fn offset_plane(level: f64, sigma: f64, seed: u64) -> Dataset {
        let mut rng = StdRng::seed_from_u64(seed);
        let xs = Uniform::new(0.0, 10.0);
        let noise = Normal::new(0.0, sigma).unwrap();
        let columns: Vec<Vec<f64>> = (0..3)
            .map(|_| (0..500).map(|_| xs.sample(&mut rng)).collect())
            .collect();
        let y: Vec<f64> = (0..500).map(|_| level + noise.sample(&mut rng)).collect();
        let refs: Vec<&[f64]> = columns.iter().map(Vec::as_slice).collect();
        Dataset::from_columns(&refs, &y).unwrap()
    }

    #[test]
    fn large_offset_low_noise_linear_fit_is_consistent() {
        for (level, sigma) in [(1e4, 1e-6), (1e6, 1e-4), (1e6, 1e-2)] {
            let data = offset_plane(level, sigma, 5);
            let fit = fit(&ModelSpec::Linear, &data, &LmOptions::default()).unwrap();

            assert_abs_diff_eq!(fit.parameters()[0], level, epsilon = 1e-6 * level);
            let check = diagnostics::evaluate(&data, &LinearModel { predictors: 3 }, fit.parameters()).unwrap();
            assert_eq!(check.sse.to_bits(), fit.sse().to_bits());
            assert_eq!(check.r_squared.to_bits(), fit.r_squared().to_bits());
            assert!(fit.r_squared() <= 1.0);
        }
    }

    #[test]
    fn predictor_count_mismatch_is_an_error() {
        let samples = (0..10).map(|i| crate::domain::Sample::new(vec![], f64::from(i))).collect();
        let data = Dataset::new(samples).unwrap();
        let spec = ModelSpec::saturating_exponential([150.0, 0.03, 5.0]);
        assert!(matches!(
            fit(&spec, &data, &LmOptions::default()),
            Err(FitError::InvalidInput(_))
        ));
    }

    #[test]
    fn solver_errors_pass_through() {
        let data = Dataset::univariate(&[1.0, 2.0], &[1.0, 2.0]).unwrap();
        let err = fit(&ModelSpec::Linear, &data, &LmOptions::default()).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { needed: 3, got: 2 });

        let spec = ModelSpec::saturating_exponential([1.0, 0.1, 0.0]);
        let err = fit(&spec, &data, &LmOptions::default()).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { needed: 4, got: 2 });
    }

    #[test]
    fn fit_many_preserves_job_order() {
        let jobs = vec![
            FitJob::new(ModelSpec::saturating_exponential([150.0, 0.03, 5.0]), saturation()),
            FitJob::new(ModelSpec::Linear, line(30)),
            FitJob::new(ModelSpec::Linear, Dataset::univariate(&[1.0], &[1.0]).unwrap()),
        ];
        let results = fit_many(&jobs, &LmOptions::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().kind(), FitKind::Nonlinear);
        assert_eq!(results[1].as_ref().unwrap().kind(), FitKind::Linear);
        assert!(matches!(results[2], Err(FitError::InsufficientData { .. })));

        let sequential = fit(&jobs[0].spec, &jobs[0].dataset, &LmOptions::default()).unwrap();
        assert_eq!(results[0].as_ref().unwrap(), &sequential);
    }
}
