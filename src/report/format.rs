//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (and easy to pin with string tests)

use crate::domain::{CorrelationResult, FitKind, FitResult, FitStatus};
use crate::report::FittedPoint;
use crate::stats::TrendLine;
use crate::text::{RankedWord, TermScore, ZipfFit};

/// First few generated queries.
pub fn format_queries_preview(queries: &[String], count: usize) -> String {
    let mut out = String::from("Sample queries:\n");
    for q in queries.iter().take(count) {
        out.push_str(&format!("  - {q}\n"));
    }
    out
}

/// Top-N terms by mean TF-IDF.
pub fn format_tfidf(scores: &[TermScore], top_n: usize) -> String {
    let mut out = format!("Top-{} words by TF-IDF:\n", top_n.min(scores.len()));
    for s in scores.iter().take(top_n) {
        out.push_str(&format!("  {:<12} {:.4}\n", s.term, s.score));
    }
    out
}

/// Rank/frequency table plus the fitted exponent when available.
pub fn format_zipf(ranked: &[RankedWord], fit: Option<&ZipfFit>) -> String {
    let mut out = String::from("Zipf rank/frequency:\n");
    out.push_str(format!("{:>6} {:<12} {:>8}", "rank", "word", "count").trim_end());
    out.push('\n');
    out.push_str(format!("{:->6} {:-<12} {:->8}", "", "", "").trim_end());
    out.push('\n');
    for w in ranked {
        out.push_str(&format!("{:>6} {:<12} {:>8}\n", w.rank, truncate(&w.word, 12), w.count));
    }
    if let Some(fit) = fit {
        out.push_str(&format!(
            "Zipf exponent s={:.3} (log-log R²={:.4})\n",
            fit.exponent, fit.r_squared
        ));
    }
    out
}

/// Correlation coefficient, significance and least-squares trend line.
pub fn format_correlation(title: &str, result: &CorrelationResult, trend: &TrendLine) -> String {
    let mut out = format!("=== {title} ===\n");
    out.push_str(&format!(
        "Pearson r = {:.3} | p-value = {:.5} | n = {}\n",
        result.r, result.p_value, result.n
    ));
    out.push_str(&format!(
        "Trend: y = {:.3} {} {:.3}*x\n",
        trend.intercept,
        sign(trend.slope),
        trend.slope.abs()
    ));
    out
}

/// Coefficient table and goodness-of-fit summary for any fit.
pub fn format_fit_summary(title: &str, fit: &FitResult, param_names: &[String]) -> String {
    let mut out = format!("=== {title} ===\n");

    let kind = match fit.kind() {
        FitKind::Linear => "linear",
        FitKind::Nonlinear => "nonlinear",
    };
    let status = match (fit.kind(), fit.status()) {
        (FitKind::Linear, _) => "closed form".to_string(),
        (_, FitStatus::Converged) => format!("converged after {} iterations", fit.iterations()),
        (_, FitStatus::MaxIterationsReached) => {
            format!("NOT converged (stopped after {} iterations)", fit.iterations())
        }
    };
    out.push_str(&format!(
        "Model: {} ({kind}) | n={} | dof={} | {status}\n",
        fit.model_name(),
        fit.n(),
        fit.dof()
    ));
    out.push('\n');

    out.push_str(
        format!(
            "{:<14} {:>12} {:>12} {:>10} {:>8}",
            "", "coef", "std err", "t", "P>|t|"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<14} {:->12} {:->12} {:->10} {:->8}", "", "", "", "", "").trim_end());
    out.push('\n');
    for (i, row) in fit.parameter_table().iter().enumerate() {
        let name = param_names.get(i).map(String::as_str).unwrap_or("?");
        out.push_str(&format!(
            "{:<14} {:>12.4} {:>12.4} {:>10.3} {:>8.4}\n",
            truncate(name, 14),
            row.estimate,
            row.std_error,
            row.t_value,
            row.p_value
        ));
    }
    out.push('\n');

    out.push_str(&format!(
        "R² = {:.4} | adj. R² = {:.4} | RMSE = {:.3} | SSE = {:.3}\n",
        fit.r_squared(),
        fit.adjusted_r_squared(),
        fit.rmse(),
        fit.sse()
    ));
    if let Some(f) = fit.f_test() {
        out.push_str(&format!(
            "F({}, {}) = {:.3} | Prob(F) = {:.4}\n",
            f.df_model, f.df_resid, f.statistic, f.p_value
        ));
    }

    out
}

/// `Y = b0 + b1*X1 + …` with two decimals, one term per slope.
pub fn format_equation(fit: &FitResult) -> String {
    let params = fit.parameters();
    let Some((&b0, slopes)) = params.split_first() else {
        return "Y = 0".to_string();
    };
    let mut out = format!("Y = {b0:.2}");
    for (j, &b) in slopes.iter().enumerate() {
        out.push_str(&format!(" {} {:.2}*X{}", sign(b), b.abs(), j + 1));
    }
    out
}

/// Table of the largest residuals.
pub fn format_residuals(points: &[FittedPoint]) -> String {
    let mut out = String::from("Largest residuals:\n");
    out.push_str(format!("{:>10} {:>12} {:>12} {:>12}", "x", "y_obs", "y_fit", "residual").trim_end());
    out.push('\n');
    out.push_str(format!("{:->10} {:->12} {:->12} {:->12}", "", "", "", "").trim_end());
    out.push('\n');
    for p in points {
        out.push_str(&format!(
            "{:>10.3} {:>12.3} {:>12.3} {:>12.3}\n",
            p.x, p.y_obs, p.y_fit, p.residual
        ));
    }
    out
}

fn sign(v: f64) -> char {
    if v.is_sign_negative() { '-' } else { '+' }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
