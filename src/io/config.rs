//! TOML run configuration files.

use std::path::Path;

use crate::domain::RaceConfig;
use crate::error::AppError;

/// Load a `RaceConfig` from a TOML file. Missing keys take their defaults.
pub fn load_config(path: &Path) -> Result<RaceConfig, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::new(2, format!("Failed to read config '{}': {e}", path.display()))
    })?;
    toml::from_str(&text)
        .map_err(|e| AppError::new(2, format!("Invalid config '{}': {e}", path.display())))
}
