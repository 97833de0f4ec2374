//! Mean TF-IDF keyword scores over a set of short documents.
//!
//! Weighting (the common "smoothed idf, l2 rows" convention):
//!
//! ```text
//! tf(t, d)  = raw count of t in d
//! idf(t)    = ln((1 + n) / (1 + df(t))) + 1
//! w(t, d)   = tf · idf, then each document row is scaled to unit L2 norm
//! score(t)  = mean over all n documents of w(t, d)
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::FitError;

/// A term and its mean TF-IDF weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermScore {
    pub term: String,
    pub score: f64,
}

/// Lowercased runs of at least two alphanumeric (or `_`) characters.
pub fn tokenize(doc: &str) -> Vec<String> {
    doc.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Score every vocabulary term; highest score first, ties broken by term.
pub fn mean_tfidf<S: AsRef<str>>(docs: &[S]) -> Result<Vec<TermScore>, FitError> {
    if docs.is_empty() {
        return Err(FitError::InsufficientData { needed: 1, got: 0 });
    }
    let n = docs.len();

    let counts: Vec<BTreeMap<String, usize>> = docs
        .iter()
        .map(|d| {
            let mut tf = BTreeMap::new();
            for t in tokenize(d.as_ref()) {
                *tf.entry(t).or_insert(0) += 1;
            }
            tf
        })
        .collect();

    let mut df: BTreeMap<&str, usize> = BTreeMap::new();
    for tf in &counts {
        for term in tf.keys() {
            *df.entry(term.as_str()).or_insert(0) += 1;
        }
    }
    if df.is_empty() {
        return Err(FitError::DegenerateInput(
            "documents contain no tokens of two or more characters".to_string(),
        ));
    }

    let idf: BTreeMap<&str, f64> = df
        .iter()
        .map(|(&t, &d)| (t, ((1 + n) as f64 / (1 + d) as f64).ln() + 1.0))
        .collect();

    let mut totals: BTreeMap<&str, f64> = idf.keys().map(|&t| (t, 0.0)).collect();
    for tf in &counts {
        let weights: Vec<(&str, f64)> = tf
            .iter()
            .map(|(t, &c)| (t.as_str(), c as f64 * idf[t.as_str()]))
            .collect();
        let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            continue;
        }
        for (t, w) in weights {
            if let Some(total) = totals.get_mut(t) {
                *total += w / norm;
            }
        }
    }

    let mut scores: Vec<TermScore> = totals
        .into_iter()
        .map(|(term, total)| TermScore {
            term: term.to_string(),
            score: total / n as f64,
        })
        .collect();
    scores.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.term.cmp(&b.term)));
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn tokenizer_drops_single_characters() {
        assert_eq!(tokenize("A Book, to read!"), vec!["book", "to", "read"]);
    }

    #[test]
    fn two_document_example() {
        let scores = mean_tfidf(&["book read", "book"]).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].term, "book");
        assert_abs_diff_eq!(scores[0].score, 0.789_869_335_768_832_9, epsilon = 1e-12);
        assert_eq!(scores[1].term, "read");
        assert_abs_diff_eq!(scores[1].score, 0.407_401_237_333_584_5, epsilon = 1e-12);
    }

    #[test]
    fn ties_are_ordered_by_term() {
        let scores = mean_tfidf(&["genre author"]).unwrap();
        assert_eq!(scores[0].term, "author");
        assert_eq!(scores[1].term, "genre");
        assert_eq!(scores[0].score, scores[1].score);
    }

    #[test]
    fn empty_input_is_rejected() {
        let none: [&str; 0] = [];
        assert!(matches!(mean_tfidf(&none), Err(FitError::InsufficientData { .. })));
        assert!(matches!(mean_tfidf(&["a b c"]), Err(FitError::DegenerateInput(_))));
    }
}
