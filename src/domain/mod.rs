//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the tabular dataset model (`Dataset`, `Record`, `Value`)
//! - race values (`Partition`, `Candidate`, `Params`, `Trial`, ...)
//! - run configuration (`RaceConfig`)

pub mod config;
pub mod dataset;
pub mod types;

pub use config::*;
pub use dataset::*;
pub use types::*;
