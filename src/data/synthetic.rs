//! Seeded synthetic "library usage" datasets.
//!
//! Every generator takes an explicit seed so a run is reproducible end to
//! end. Ranges are half-open unless noted:
//!
//! - queries: 3–5 keywords each, drawn with replacement
//! - activity: visits in 1..=100, session ≈ 2.5·visits + 30 (σ = 20)
//! - saturation: visits in 1..=99, pages ≈ 200·(1 − e^{−0.05·visits}) + 10 (σ = 10)
//! - regression: visits in 1..=49, session in [5, 60), searches in 0..=19

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Normal, Uniform};

use crate::domain::Dataset;
use crate::error::{AppError, FitError};

/// Vocabulary of the query generator.
pub const LIBRARY_KEYWORDS: [&str; 10] = [
    "book",
    "read",
    "download",
    "user",
    "electronic",
    "library",
    "new",
    "genre",
    "author",
    "rating",
];

/// Parameters `[a, b, c]` used to generate the saturation data.
pub const SATURATION_TRUTH: [f64; 3] = [200.0, 0.05, 10.0];

/// Coefficients `[const, visits, session, searches]` of the regression data.
pub const REGRESSION_TRUTH: [f64; 4] = [5.0, 2.5, 1.8, 0.9];

/// Per-user visit counts and average session time (minutes).
#[derive(Debug, Clone)]
pub struct ActivityData {
    pub user_ids: Vec<usize>,
    pub visits: Vec<f64>,
    pub session_time: Vec<f64>,
}

impl ActivityData {
    pub fn to_dataset(&self) -> Result<Dataset, FitError> {
        Dataset::univariate(&self.visits, &self.session_time)
    }
}

/// Visits against pages read per session.
#[derive(Debug, Clone)]
pub struct SaturationData {
    pub visits: Vec<f64>,
    pub pages: Vec<f64>,
}

impl SaturationData {
    pub fn to_dataset(&self) -> Result<Dataset, FitError> {
        Dataset::univariate(&self.visits, &self.pages)
    }
}

/// Three predictors and pages read.
#[derive(Debug, Clone)]
pub struct RegressionData {
    pub visits: Vec<f64>,
    pub session_time: Vec<f64>,
    pub searches: Vec<f64>,
    pub pages: Vec<f64>,
}

impl RegressionData {
    pub const PREDICTORS: [&'static str; 3] = ["visits", "session_time", "searches"];

    pub fn to_dataset(&self) -> Result<Dataset, FitError> {
        Dataset::from_columns(&[&self.visits, &self.session_time, &self.searches], &self.pages)
    }
}

/// Random search queries of 3–5 keywords.
pub fn generate_queries(count: usize, seed: u64) -> Result<Vec<String>, AppError> {
    ensure_count(count, "Query count")?;
    let mut rng = StdRng::seed_from_u64(seed);

    let queries = (0..count)
        .map(|_| {
            let k = rng.gen_range(3..=5);
            (0..k)
                .map(|_| LIBRARY_KEYWORDS[rng.gen_range(0..LIBRARY_KEYWORDS.len())])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    Ok(queries)
}

/// Visits vs. average session time with a linear trend.
pub fn generate_activity(n: usize, seed: u64) -> Result<ActivityData, AppError> {
    ensure_count(n, "User count")?;
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = normal(20.0)?;

    let mut visits = Vec::with_capacity(n);
    let mut session_time = Vec::with_capacity(n);
    for _ in 0..n {
        let v = f64::from(rng.gen_range(1u32..=100));
        visits.push(v);
        session_time.push(2.5 * v + 30.0 + noise.sample(&mut rng));
    }

    Ok(ActivityData {
        user_ids: (1..=n).collect(),
        visits,
        session_time,
    })
}

/// Visits vs. pages per session following a saturating exponential.
pub fn generate_saturation(n: usize, seed: u64) -> Result<SaturationData, AppError> {
    ensure_count(n, "Sample count")?;
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = normal(10.0)?;
    let [a, b, c] = SATURATION_TRUTH;

    let mut visits = Vec::with_capacity(n);
    let mut pages = Vec::with_capacity(n);
    for _ in 0..n {
        let v = f64::from(rng.gen_range(1u32..=99));
        visits.push(v);
        pages.push(a * (1.0 - (-b * v).exp()) + c + noise.sample(&mut rng));
    }

    Ok(SaturationData { visits, pages })
}

/// Pages read as a noisy linear function of visits, session time and searches.
pub fn generate_regression(n: usize, seed: u64) -> Result<RegressionData, AppError> {
    ensure_count(n, "Sample count")?;
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = normal(25.0)?;
    let session_dist = Uniform::new(5.0, 60.0);
    let [b0, b1, b2, b3] = REGRESSION_TRUTH;

    let mut data = RegressionData {
        visits: Vec::with_capacity(n),
        session_time: Vec::with_capacity(n),
        searches: Vec::with_capacity(n),
        pages: Vec::with_capacity(n),
    };
    for _ in 0..n {
        let v = f64::from(rng.gen_range(1u32..=49));
        let s = session_dist.sample(&mut rng);
        let q = f64::from(rng.gen_range(0u32..=19));
        data.visits.push(v);
        data.session_time.push(s);
        data.searches.push(q);
        data.pages.push(b0 + b1 * v + b2 * s + b3 * q + noise.sample(&mut rng));
    }

    Ok(data)
}

fn ensure_count(n: usize, what: &str) -> Result<(), AppError> {
    if n == 0 {
        return Err(AppError::new(2, format!("{what} must be > 0.")));
    }
    Ok(())
}

fn normal(sigma: f64) -> Result<Normal<f64>, AppError> {
    Normal::new(0.0, sigma).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))
}
