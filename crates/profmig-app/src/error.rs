//! # Design
//!
//! - Centralize batch-level errors for bootstrap, journaling and output files.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Per-profile stage failures never surface here; they become outcomes.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration was rejected.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: profmig_config::ConfigError,
    },
    /// Telemetry setup failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
    /// The profile list could not be produced.
    #[error("profile source failed")]
    Source {
        /// Operation identifier.
        operation: &'static str,
        /// Source collaborator error.
        source: profmig_core::CollaboratorError,
    },
    /// Transfer rules could not be compiled.
    #[error("transfer setup failed")]
    Transfer {
        /// Operation identifier.
        operation: &'static str,
        /// Source transfer error.
        source: profmig_fsops::TransferError,
    },
    /// Removal rules could not be compiled.
    #[error("cleanup rules invalid")]
    Rules {
        /// Operation identifier.
        operation: &'static str,
        /// Source rule error.
        source: profmig_fsops::RuleError,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// JSON encoding or decoding failed.
    #[error("json operation failed")]
    Json {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source JSON error.
        source: serde_json::Error,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: profmig_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) fn telemetry(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Telemetry {
            operation,
            source: source.into(),
        }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(operation: &'static str, path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether the error stems from invalid configuration rather than a runtime failure.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::Transfer { .. } | Self::Rules { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_build_variants() {
        let config = AppError::config(
            "validate",
            profmig_config::ConfigError::InvalidField {
                field: "target_root",
                reason: "missing",
                value: None,
            },
        );
        assert!(config.is_configuration());

        let telemetry = AppError::telemetry("init", anyhow::anyhow!("subscriber already set"));
        assert!(matches!(telemetry, AppError::Telemetry { operation: "init", .. }));
        assert!(!telemetry.is_configuration());

        let io = AppError::io("report.write", "/tmp/report.json", io::Error::other("disk full"));
        assert!(matches!(io, AppError::Io { .. }));
        assert!(io.source().is_some());
    }
}
