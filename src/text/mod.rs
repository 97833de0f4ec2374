//! Text statistics over user search queries.
//!
//! - mean TF-IDF keyword ranking (`tfidf`)
//! - Zipf rank/frequency analysis (`zipf`)

pub mod tfidf;
pub mod zipf;

pub use tfidf::*;
pub use zipf::*;
