//! Zipf's-law rank/frequency analysis.
//!
//! Frequencies are ranked from most to least common and the exponent `s` of
//! `freq ∝ rank^(−s)` is estimated by a straight-line fit in log–log space.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::Dataset;
use crate::error::FitError;
use crate::fit::fit_ols;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedWord {
    pub rank: usize,
    pub word: String,
    pub count: usize,
}

/// Log–log fit `ln(freq) = intercept − exponent · ln(rank)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZipfFit {
    pub exponent: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Count whitespace-separated words and rank them (rank 1 is most frequent).
pub fn rank_frequencies<S: AsRef<str>>(docs: &[S]) -> Vec<RankedWord> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for doc in docs {
        for word in doc.as_ref().split_whitespace() {
            *counts.entry(word).or_insert(0) += 1;
        }
    }

    let mut sorted: Vec<(&str, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, (word, count))| RankedWord {
            rank: i + 1,
            word: word.to_string(),
            count,
        })
        .collect()
}

/// Estimate the Zipf exponent from ranked words (needs at least 3).
pub fn fit_exponent(ranked: &[RankedWord]) -> Result<ZipfFit, FitError> {
    let log_rank: Vec<f64> = ranked.iter().map(|w| (w.rank as f64).ln()).collect();
    let log_freq: Vec<f64> = ranked.iter().map(|w| (w.count as f64).ln()).collect();
    if ranked.is_empty() {
        return Err(FitError::InsufficientData { needed: 3, got: 0 });
    }

    let data = Dataset::univariate(&log_rank, &log_freq)?;
    let fit = fit_ols(&data)?;
    Ok(ZipfFit {
        exponent: -fit.parameters()[1],
        intercept: fit.parameters()[0],
        r_squared: fit.r_squared(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn ranks_by_count_then_word() {
        let ranked = rank_frequencies(&["book read book", "author read book", "genre"]);
        let words: Vec<(&str, usize)> = ranked.iter().map(|w| (w.word.as_str(), w.count)).collect();
        assert_eq!(
            words,
            vec![("book", 3), ("read", 2), ("author", 1), ("genre", 1)]
        );
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[3].rank, 4);
    }

    #[test]
    fn exact_power_law_recovers_exponent() {
        // count = 1000 / rank exactly for these ranks.
        let ranked: Vec<RankedWord> = [1000, 500, 250, 200, 125, 100]
            .iter()
            .zip([1usize, 2, 4, 5, 8, 10])
            .map(|(&count, rank)| RankedWord {
                rank,
                word: format!("w{rank}"),
                count,
            })
            .collect();
        let fit = fit_exponent(&ranked).unwrap();
        assert_abs_diff_eq!(fit.exponent, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.intercept, 1000f64.ln(), epsilon = 1e-9);
        assert_abs_diff_eq!(fit.r_squared, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn needs_three_words() {
        let ranked = rank_frequencies(&["book book read"]);
        assert_eq!(
            fit_exponent(&ranked).unwrap_err(),
            FitError::InsufficientData { needed: 3, got: 2 }
        );
    }
}
