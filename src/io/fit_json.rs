//! Read/write fit JSON files.
//!
//! Fit JSON is the portable representation of a finished fit:
//! - model name, parameters, standard errors and covariance
//! - goodness-of-fit metrics and convergence status
//! - a precomputed fitted grid (single-predictor models) for quick plotting
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::domain::{Dataset, FitFile, FitGrid, FitResult};
use crate::error::AppError;
use crate::models::Model;

const GRID_POINTS: usize = 101;

/// Build the portable record for a fit of `model` to `data`.
pub fn fit_file(fit: &FitResult, model: &dyn Model, data: &Dataset, generated_at: DateTime<Utc>) -> FitFile {
    let cov = fit.covariance();
    FitFile {
        tool: "libstats".to_string(),
        generated_at,
        model: fit.model_name().to_string(),
        kind: fit.kind(),
        param_names: model.param_names(),
        parameters: fit.parameters().to_vec(),
        std_errors: fit.std_errors(),
        covariance: (0..cov.nrows())
            .map(|i| cov.row(i).iter().copied().collect())
            .collect(),
        quality: fit.quality(),
        iterations: fit.iterations(),
        status: fit.status(),
        grid: (data.dim() == 1).then(|| build_grid(fit, model, data, GRID_POINTS)),
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, file: &FitFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file)
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))?;
    Ok(fit)
}

fn build_grid(fit: &FitResult, model: &dyn Model, data: &Dataset, n: usize) -> FitGrid {
    let n = n.max(2);
    let (mut x0, mut x1) = data
        .samples()
        .iter()
        .map(|s| s.x()[0])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
    if (x1 - x0).abs() < 1e-9 {
        x0 -= 0.5;
        x1 += 0.5;
    }

    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let xi = x0 + u * (x1 - x0);
        x.push(xi);
        y.push(model.predict(&[xi], fit.parameters()));
    }

    FitGrid { x, y }
}
