//! Numerical utilities: least squares, statistics, scoring metrics.

pub mod metrics;
pub mod ols;
pub mod stats;

pub use ols::*;
