//! Input/output helpers.
//!
//! - CSV ingest + row validation (`ingest`)
//! - TOML run configuration (`config`)
//! - trials / predictions CSV exports (`export`)
//! - model artifact JSON read/write (`model`)

pub mod config;
pub mod export;
pub mod ingest;
pub mod model;

pub use config::*;
pub use export::*;
pub use ingest::*;
pub use model::*;
