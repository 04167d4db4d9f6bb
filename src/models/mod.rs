//! Learners and the feature encoder.
//!
//! Learners are small pure-Rust implementations behind one fit/predict
//! contract (`model::fit` / `FittedModel`), so the race code stays generic
//! over algorithms.

pub mod encode;
pub mod knn;
pub mod linear;
pub mod model;
pub mod tree;

pub use encode::*;
pub use model::*;
