//! `race-tune` library crate.
//!
//! The binary (`race`) is a thin wrapper around this library so that:
//!
//! - the race is testable without spawning processes
//! - the resampler, learners and race controller are reusable on their own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod grid;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod race;
pub mod report;
pub mod resample;
