//! Shared exercise pipelines used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! generate data -> build a dataset -> fit / test -> residuals
//!
//! The command handlers can then focus on presentation (printing, plotting
//! and exports).

use std::sync::Arc;

use tracing::{info, warn};

use crate::data::{
    ActivityData, RegressionData, SaturationData, generate_activity, generate_queries, generate_regression,
    generate_saturation,
};
use crate::domain::{CorrelationResult, Dataset, FitResult, RunConfig};
use crate::error::AppError;
use crate::fit::{FitJob, LmOptions, fit, fit_many};
use crate::models::{Model, ModelSpec, SaturatingExponential};
use crate::report::{FittedPoint, compute_fitted, largest_residuals};
use crate::stats::{TrendLine, pearson, trend_line};
use crate::text::{RankedWord, TermScore, ZipfFit, fit_exponent, mean_tfidf, rank_frequencies};

/// Outputs of the query-text exercise.
#[derive(Debug, Clone)]
pub struct TextRun {
    pub queries: Vec<String>,
    pub scores: Vec<TermScore>,
    pub ranked: Vec<RankedWord>,
    /// `None` when fewer than three distinct words occur.
    pub zipf: Option<ZipfFit>,
}

/// Outputs of the visits/session-time correlation exercise.
#[derive(Debug, Clone)]
pub struct CorrelationRun {
    pub data: ActivityData,
    pub dataset: Dataset,
    pub correlation: CorrelationResult,
    pub trend: TrendLine,
}

/// One finished model fit plus what the report needs from it.
#[derive(Clone)]
pub struct FitRun {
    pub dataset: Dataset,
    pub model: Arc<dyn Model>,
    pub fit: FitResult,
    pub largest: Vec<FittedPoint>,
}

impl std::fmt::Debug for FitRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitRun")
            .field("model", &self.model.name())
            .field("n", &self.dataset.len())
            .field("fit", &self.fit)
            .finish()
    }
}

/// Everything `libstats all` prints.
#[derive(Debug, Clone)]
pub struct AllRun {
    pub text: TextRun,
    pub correlation: CorrelationRun,
    pub saturation_data: SaturationData,
    pub saturation: FitRun,
    pub regression_data: RegressionData,
    pub regression: FitRun,
}

/// Optimizer settings for a run.
pub fn lm_options(config: &RunConfig) -> LmOptions {
    LmOptions::default().with_max_iterations(config.max_iterations)
}

pub fn run_text(config: &RunConfig) -> Result<TextRun, AppError> {
    let queries = generate_queries(config.queries, config.seed)?;
    let scores = mean_tfidf(&queries)?;
    let ranked = rank_frequencies(&queries);
    let zipf = match fit_exponent(&ranked) {
        Ok(z) => Some(z),
        Err(e) => {
            warn!(error = %e, "skipping Zipf exponent");
            None
        }
    };
    info!(queries = queries.len(), vocabulary = scores.len(), "text statistics computed");

    Ok(TextRun {
        queries,
        scores,
        ranked,
        zipf,
    })
}

pub fn run_correlation(config: &RunConfig) -> Result<CorrelationRun, AppError> {
    let data = generate_activity(config.n, config.seed)?;
    let dataset = data.to_dataset()?;
    let correlation = pearson(&data.visits, &data.session_time)?;
    let trend = trend_line(&data.visits, &data.session_time)?;
    info!(n = dataset.len(), r = correlation.r, "correlation computed");

    Ok(CorrelationRun {
        data,
        dataset,
        correlation,
        trend,
    })
}

/// Saturating-exponential job over freshly generated data.
pub fn saturation_job(config: &RunConfig) -> Result<(SaturationData, FitJob), AppError> {
    let data = generate_saturation(config.n, config.seed)?;
    let dataset = data.to_dataset()?;
    let spec = ModelSpec::Nonlinear {
        model: Arc::new(SaturatingExponential),
        initial_guess: config.initial_guess.clone(),
    };
    Ok((data, FitJob::new(spec, dataset)))
}

/// Multivariate OLS job over freshly generated data.
pub fn regression_job(config: &RunConfig) -> Result<(RegressionData, FitJob), AppError> {
    let data = generate_regression(config.n, config.seed)?;
    let dataset = data.to_dataset()?;
    Ok((data, FitJob::new(ModelSpec::Linear, dataset)))
}

pub fn run_saturation(config: &RunConfig) -> Result<(SaturationData, FitRun), AppError> {
    let (data, job) = saturation_job(config)?;
    let result = fit(&job.spec, &job.dataset, &lm_options(config))?;
    Ok((data, finish(job, result, config.top_n)?))
}

pub fn run_regression(config: &RunConfig) -> Result<(RegressionData, FitRun), AppError> {
    let (data, job) = regression_job(config)?;
    let result = fit(&job.spec, &job.dataset, &lm_options(config))?;
    Ok((data, finish(job, result, config.top_n)?))
}

/// Every exercise; the three model fits (trend line, saturation, regression)
/// run in parallel through `fit_many`.
pub fn run_all(config: &RunConfig) -> Result<AllRun, AppError> {
    let text = run_text(config)?;

    let activity = generate_activity(config.n, config.seed)?;
    let activity_set = activity.to_dataset()?;
    let correlation = pearson(&activity.visits, &activity.session_time)?;

    let (saturation_data, sat_job) = saturation_job(config)?;
    let (regression_data, reg_job) = regression_job(config)?;

    let jobs = vec![FitJob::new(ModelSpec::Linear, activity_set.clone()), sat_job, reg_job];
    let mut results = fit_many(&jobs, &lm_options(config)).into_iter();
    let mut jobs = jobs.into_iter();

    let mut next = || -> Result<(FitJob, FitResult), AppError> {
        match (jobs.next(), results.next()) {
            (Some(job), Some(result)) => Ok((job, result?)),
            _ => Err(AppError::new(4, "Parallel fit returned fewer results than jobs.")),
        }
    };

    let (_, trend_fit) = next()?;
    let trend = TrendLine {
        intercept: trend_fit.parameters()[0],
        slope: trend_fit.parameters()[1],
    };
    let (job, result) = next()?;
    let saturation = finish(job, result, config.top_n)?;
    let (job, result) = next()?;
    let regression = finish(job, result, config.top_n)?;

    Ok(AllRun {
        text,
        correlation: CorrelationRun {
            data: activity,
            dataset: activity_set,
            correlation,
            trend,
        },
        saturation_data,
        saturation,
        regression_data,
        regression,
    })
}

fn finish(job: FitJob, result: FitResult, top_n: usize) -> Result<FitRun, AppError> {
    let model = job.spec.model(job.dataset.dim());
    let fitted = compute_fitted(&job.dataset, model.as_ref(), &result)?;
    if !result.converged() {
        warn!(model = model.name(), iterations = result.iterations(), "fit did not converge");
    }
    Ok(FitRun {
        largest: largest_residuals(&fitted, top_n),
        dataset: job.dataset,
        model,
        fit: result,
    })
}
