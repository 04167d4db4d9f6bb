use std::fmt;

use crate::domain::{CandidateId, PartitionId};

/// Where a fit was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitScope {
    Partition(PartitionId),
    FullData,
}

impl fmt::Display for FitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitScope::Partition(p) => write!(f, "partition {p}"),
            FitScope::FullData => write!(f, "the full training set"),
        }
    }
}

/// Error surfaced at the binary boundary: a message plus the process exit code.
///
/// Exit codes:
/// - `2`: bad input (flags, config, files)
/// - `3`: nothing usable came out of the race
/// - `4`: numerical/fit failure outside the race loop
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failures of the model-selection core.
///
/// `FitError` and `PartitionError` are recorded during a race and never abort
/// it; they only surface as errors when raised outside the round loop (the
/// final refit, or a caller checking a partition directly).
#[derive(Debug, Clone, thiserror::Error)]
pub enum RaceError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Empty parameter grid for algorithm `{algorithm}`: {reason}")]
    EmptyGrid { algorithm: String, reason: String },
    #[error("Fit failed for candidate {candidate} on {scope}: {cause}")]
    FitError {
        candidate: CandidateId,
        scope: FitScope,
        cause: String,
    },
    #[error("Partition {partition} is unusable: {cause}")]
    PartitionError { partition: PartitionId, cause: String },
    #[error(
        "No surviving candidate out of {candidates}: {by_failure} eliminated by fit failures, {by_statistics} by the elimination test"
    )]
    NoSurvivors {
        candidates: usize,
        by_failure: usize,
        by_statistics: usize,
    },
}

impl RaceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RaceError::InvalidConfiguration(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            RaceError::InvalidConfiguration(_) | RaceError::EmptyGrid { .. } => 2,
            RaceError::NoSurvivors { .. } => 3,
            RaceError::FitError { .. } | RaceError::PartitionError { .. } => 4,
        }
    }
}

impl From<RaceError> for AppError {
    fn from(err: RaceError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}
