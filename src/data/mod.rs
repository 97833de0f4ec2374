//! Data sources for the pipeline.
//!
//! - seeded synthetic library-usage datasets (`synthetic`)

pub mod synthetic;

pub use synthetic::*;
