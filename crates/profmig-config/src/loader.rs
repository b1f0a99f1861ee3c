//! JSON configuration file loading.
//!
//! # Design
//! - Missing fields fall back to defaults; unknown fields are rejected so typos surface early.
//! - Validation is left to the caller, which applies CLI overrides first.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::MigrationConfig;

/// Load a configuration file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read and [`ConfigError::Json`]
/// when it does not describe a [`MigrationConfig`].
pub fn load_file(path: &Path) -> ConfigResult<MigrationConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read",
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded configuration file");
    Ok(config)
}
