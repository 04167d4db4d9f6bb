//! Read/write model artifact JSON files.
//!
//! The artifact is the serialized `FinalModel`: the winning candidate, the
//! fitted encoder and learner, and the schema needed to type new inputs.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::AppError;
use crate::race::FinalModel;

/// Write a model artifact.
pub fn write_model_json(path: &Path, model: &FinalModel) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create model JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, model)
        .map_err(|e| AppError::new(2, format!("Failed to write model JSON: {e}")))?;
    Ok(())
}

/// Read a model artifact.
pub fn read_model_json(path: &Path) -> Result<FinalModel, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open model JSON '{}': {e}", path.display()))
    })?;
    let model: FinalModel = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid model JSON: {e}")))?;
    Ok(model)
}
