//! Command-line parsing for the library statistics tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting engine and the pipeline. Flags are turned into a plain
//! `RunConfig` once, in `app::run_config_from_args`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "libstats",
    version,
    about = "Library usage statistics: TF-IDF, correlation, curve fitting and regression"
)]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rank query keywords by mean TF-IDF and check Zipf's law.
    Tfidf(RunArgs),
    /// Correlate visits with average session time and fit a trend line.
    Correlation(RunArgs),
    /// Fit a saturating exponential to pages per session vs. visits.
    Saturation(RunArgs),
    /// Multivariate OLS of pages read on visits, session time and searches.
    Regression(RunArgs),
    /// Plot a previously exported fit JSON.
    Plot(PlotArgs),
    /// Run every exercise; the fits run in parallel.
    All(RunArgs),
}

/// Options shared by the exercise subcommands.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Number of samples per generated dataset.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub samples: usize,

    /// Number of generated search queries.
    #[arg(long, default_value_t = 100)]
    pub queries: usize,

    /// Random seed for data generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// How many entries to show in top-N tables.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Initial guess `a,b,c` for the saturating-exponential fit.
    #[arg(
        long,
        value_delimiter = ',',
        allow_negative_numbers = true,
        default_values_t = [150.0, 0.03, 5.0]
    )]
    pub guess: Vec<f64>,

    /// Levenberg–Marquardt iteration ceiling.
    #[arg(long, default_value_t = 200)]
    pub max_iterations: usize,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the generated dataset to CSV (correlation and saturation).
    ///
    /// With `all`, this and `--export-fit` name output directories.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the fit (parameters, covariance, metrics, fitted grid) to JSON
    /// (saturation and regression).
    #[arg(long = "export-fit")]
    pub export_fit: Option<PathBuf>,
}

/// Options for plotting a saved fit.
#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Fit JSON file produced by `--export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}
