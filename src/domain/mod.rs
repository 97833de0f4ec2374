//! Domain types used throughout the engine and the pipeline.
//!
//! This module defines:
//!
//! - validated inputs (`Sample`, `Dataset`)
//! - fit outputs (`FitResult`, `FitQuality`, `CorrelationResult`, etc.)
//! - the run configuration consumed by the binary (`RunConfig`)

pub mod types;

pub use types::*;
