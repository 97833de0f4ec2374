//! Mathematical utilities: dense linear algebra for the least-squares solvers.

pub mod linalg;

pub use linalg::*;
