//! Model families: the `Model` trait, built-ins and the `ModelSpec` tag.
//!
//! Models are small, pure evaluators so that fitting code can stay generic.

pub mod model;

pub use model::*;
