//! Hypothesis tests and the distribution tails they need.

pub mod correlation;

pub use correlation::*;

use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

/// Two-sided p-value of a t-statistic with `df` degrees of freedom.
///
/// Infinite `|t|` gives `0.0`; invalid `df` or NaN `t` gives NaN.
pub fn two_sided_t_p_value(t: f64, df: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

/// Upper-tail p-value `P(F > f)` of the Fisher–Snedecor distribution.
pub fn f_upper_p_value(f: f64, df1: f64, df2: f64) -> f64 {
    if f.is_nan() {
        return f64::NAN;
    }
    if f.is_infinite() {
        return 0.0;
    }
    match FisherSnedecor::new(df1, df2) {
        Ok(dist) => dist.sf(f.max(0.0)).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}
