//! Data sources other than user CSVs.

pub mod synth;

pub use synth::*;
