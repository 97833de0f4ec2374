//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the tracing subscriber
//! - parses CLI arguments
//! - runs the requested exercise pipeline
//! - prints reports/plots
//! - writes optional exports

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, PlotArgs, RunArgs};
use crate::domain::RunConfig;
use crate::error::AppError;
use crate::models::LinearModel;
use crate::report;

pub mod pipeline;

use pipeline::{CorrelationRun, FitRun, TextRun};

/// File names used when `all` exports into a directory.
pub const ACTIVITY_CSV: &str = "library_user_activity.csv";
pub const SATURATION_CSV: &str = "nonlinear_library_model.csv";
pub const SATURATION_FIT_JSON: &str = "saturation_fit.json";
pub const REGRESSION_FIT_JSON: &str = "regression_fit.json";

/// Entry point for the `libstats` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; it only ever supplies RUST_LOG.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::Tfidf(args) => handle_text(&run_config_from_args(&args)),
        Command::Correlation(args) => handle_correlation(&run_config_from_args(&args)),
        Command::Saturation(args) => handle_saturation(&run_config_from_args(&args)),
        Command::Regression(args) => handle_regression(&run_config_from_args(&args)),
        Command::Plot(args) => handle_plot(args),
        Command::All(args) => handle_all(&run_config_from_args(&args)),
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A subscriber may already be installed by an embedding host.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        n: args.samples,
        queries: args.queries,
        seed: args.seed,
        top_n: args.top,
        initial_guess: args.guess.clone(),
        max_iterations: args.max_iterations,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_csv: args.export.clone(),
        export_fit: args.export_fit.clone(),
    }
}

fn handle_text(config: &RunConfig) -> Result<(), AppError> {
    let run = pipeline::run_text(config)?;
    print_text(&run, config);
    Ok(())
}

fn handle_correlation(config: &RunConfig) -> Result<(), AppError> {
    let run = pipeline::run_correlation(config)?;
    print_correlation(&run, config);

    if let Some(path) = &config.export_csv {
        crate::io::write_activity_csv(path, &run.data)?;
        info!(path = %path.display(), "activity data exported");
    }
    Ok(())
}

fn handle_saturation(config: &RunConfig) -> Result<(), AppError> {
    let (data, run) = pipeline::run_saturation(config)?;
    print_saturation(&run, config);

    if let Some(path) = &config.export_csv {
        crate::io::write_saturation_csv(path, &data)?;
        info!(path = %path.display(), "saturation data exported");
    }
    if let Some(path) = &config.export_fit {
        export_fit(path, &run)?;
    }
    Ok(())
}

fn handle_regression(config: &RunConfig) -> Result<(), AppError> {
    let (data, run) = pipeline::run_regression(config)?;
    print_regression(&run, &data.visits, config);

    if let Some(path) = &config.export_fit {
        export_fit(path, &run)?;
    }
    Ok(())
}

/// `all` treats `--export` and `--export-fit` as output directories.
fn handle_all(config: &RunConfig) -> Result<(), AppError> {
    let run = pipeline::run_all(config)?;

    print_text(&run.text, config);
    println!();
    print_correlation(&run.correlation, config);
    println!();
    print_saturation(&run.saturation, config);
    println!();
    print_regression(&run.regression, &run.regression_data.visits, config);

    if let Some(dir) = &config.export_csv {
        let dir = ensure_dir(dir)?;
        crate::io::write_activity_csv(&dir.join(ACTIVITY_CSV), &run.correlation.data)?;
        crate::io::write_saturation_csv(&dir.join(SATURATION_CSV), &run.saturation_data)?;
        info!(dir = %dir.display(), "datasets exported");
    }
    if let Some(dir) = &config.export_fit {
        let dir = ensure_dir(dir)?;
        export_fit(&dir.join(SATURATION_FIT_JSON), &run.saturation)?;
        export_fit(&dir.join(REGRESSION_FIT_JSON), &run.regression)?;
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = crate::io::read_fit_json(&args.fit)?;
    let plot = crate::plot::render_fit_file_plot(&file, args.width, args.height).ok_or_else(|| {
        AppError::new(
            2,
            format!("Fit '{}' has no plot grid (only single-predictor fits are plottable).", args.fit.display()),
        )
    })?;

    println!(
        "{} fit from {} | R² = {:.4} | RMSE = {:.3}",
        file.model,
        file.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        file.quality.r_squared,
        file.quality.rmse
    );
    println!("{plot}");
    Ok(())
}

fn print_text(run: &TextRun, config: &RunConfig) {
    println!("{}", report::format_queries_preview(&run.queries, 5));
    println!("{}", report::format_tfidf(&run.scores, config.top_n));
    println!("{}", report::format_zipf(&run.ranked, run.zipf.as_ref()));
    if config.plot {
        println!(
            "{}",
            crate::plot::render_zipf_plot(&run.ranked, config.plot_width, config.plot_height)
        );
    }
}

fn print_correlation(run: &CorrelationRun, config: &RunConfig) {
    println!(
        "{}",
        report::format_correlation("Visits vs. average session time", &run.correlation, &run.trend)
    );
    if config.plot {
        let plot = crate::plot::render_fit_plot(
            &run.dataset,
            &LinearModel { predictors: 1 },
            &[run.trend.intercept, run.trend.slope],
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }
}

fn print_saturation(run: &FitRun, config: &RunConfig) {
    println!(
        "{}",
        report::format_fit_summary(
            "Pages per session vs. visits: a·(1 − e^(−b·x)) + c",
            &run.fit,
            &run.model.param_names()
        )
    );
    println!("{}", report::format_residuals(&run.largest));
    if config.plot {
        let plot = crate::plot::render_fit_plot(
            &run.dataset,
            run.model.as_ref(),
            run.fit.parameters(),
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }
}

fn print_regression(run: &FitRun, visits: &[f64], config: &RunConfig) {
    let mut names = vec!["const".to_string()];
    names.extend(crate::data::RegressionData::PREDICTORS.iter().map(|s| s.to_string()));

    println!(
        "{}",
        report::format_fit_summary("Pages read ~ visits + session time + searches", &run.fit, &names)
    );
    println!("Regression equation:\n{}\n", report::format_equation(&run.fit));
    if config.plot {
        let points: Vec<(f64, f64)> = visits.iter().copied().zip(run.dataset.responses()).collect();
        println!(
            "{}",
            crate::plot::render_scatter(&points, config.plot_width, config.plot_height)
        );
    }
}

fn export_fit(path: &Path, run: &FitRun) -> Result<(), AppError> {
    let file = crate::io::fit_file(&run.fit, run.model.as_ref(), &run.dataset, chrono::Utc::now());
    crate::io::write_fit_json(path, &file)?;
    info!(path = %path.display(), model = %file.model, "fit exported");
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create export directory '{}': {e}", dir.display())))?;
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_plot_overrides_plot() {
        let cli = Cli::try_parse_from(["libstats", "all", "--no-plot", "-n", "250", "--top", "7"]).unwrap();
        let Command::All(args) = cli.command else {
            panic!("expected all");
        };
        let config = run_config_from_args(&args);
        assert!(!config.plot);
        assert_eq!(config.n, 250);
        assert_eq!(config.top_n, 7);
        assert_eq!(config.queries, 100);
        assert!(config.export_csv.is_none());
    }

    #[test]
    fn all_exports_into_directories() {
        let dir = std::env::temp_dir().join(format!("libstats-all-{}", std::process::id()));
        let config = RunConfig {
            n: 200,
            queries: 50,
            seed: 7,
            top_n: 3,
            initial_guess: vec![150.0, 0.03, 5.0],
            max_iterations: 200,
            plot: false,
            plot_width: 40,
            plot_height: 10,
            export_csv: Some(dir.join("csv")),
            export_fit: Some(dir.join("fits")),
        };
        handle_all(&config).unwrap();

        let activity = std::fs::read_to_string(dir.join("csv").join(ACTIVITY_CSV)).unwrap();
        assert_eq!(activity.lines().count(), 201);
        let fit = crate::io::read_fit_json(&dir.join("fits").join(SATURATION_FIT_JSON)).unwrap();
        assert!(fit.grid.is_some());
        let fit = crate::io::read_fit_json(&dir.join("fits").join(REGRESSION_FIT_JSON)).unwrap();
        assert!(fit.grid.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
