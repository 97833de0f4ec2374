//! `library-stats` library crate.
//!
//! The binary (`libstats`) is a thin wrapper around this library so that:
//!
//! - the fitting engine is testable without spawning processes
//! - the engine (`math`, `models`, `fit`, `stats`) has no I/O and can be reused
//!   on its own
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod stats;
pub mod text;
