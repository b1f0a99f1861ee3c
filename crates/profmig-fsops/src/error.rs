//! # Design
//!
//! - Transfer failures are fatal to the profile and carry the accounting that was gathered.
//! - Normalization failures never fail a profile; each one becomes a [`NormalizationWarning`].
//! - Rule compilation errors are shared by the transfer and cleanup paths.

use std::error::Error as _;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;

use profmig_core::{CollaboratorError, TransferResult};
use serde::Serialize;
use thiserror::Error;

/// Glob rule compilation failures.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A pattern was blank.
    #[error("empty pattern in {field}")]
    EmptyPattern {
        /// Setting that carried the pattern.
        field: &'static str,
    },
    /// A pattern did not compile.
    #[error("invalid pattern '{pattern}' in {field}")]
    Glob {
        /// Setting that carried the pattern.
        field: &'static str,
        /// Offending pattern.
        pattern: String,
        /// Underlying globset error.
        source: globset::Error,
    },
}

/// Failures that abort the transfer of one profile.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The source folder is absent.
    #[error("source '{}' does not exist", path.display())]
    MissingSource {
        /// Source path.
        path: PathBuf,
    },
    /// Local filesystem failure.
    #[error("io failure during {operation} on '{}'", path.display())]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory traversal failure while measuring a tree.
    #[error("walk failure during {operation} on '{}'", path.display())]
    Walkdir {
        /// Operation that failed.
        operation: &'static str,
        /// Root of the traversal.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// Exclusion rules did not compile.
    #[error(transparent)]
    Rules(#[from] RuleError),
    /// The mirror tool could not be run.
    #[error("mirror tool could not run")]
    Mirror {
        /// Collaborator failure.
        source: CollaboratorError,
    },
    /// The mirror tool ran and reported failure.
    #[error("mirror failed ({})", exit_label(.result))]
    Failed {
        /// Accounting for the failed pass.
        result: Box<TransferResult>,
    },
}

impl TransferError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

fn exit_label(result: &TransferResult) -> String {
    result
        .exit_code
        .map_or_else(|| "terminated without exit code".to_string(), |code| format!("exit code {code}"))
}

/// Failures of individual normalization steps.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// An ownership or ACL edit failed.
    #[error("{step} failed on '{}'", path.display())]
    Ownership {
        /// Ownership step that failed.
        step: &'static str,
        /// Path being edited.
        path: PathBuf,
        /// Collaborator failure.
        source: CollaboratorError,
    },
    /// The hive could not be loaded.
    #[error("hive '{}' not loaded after {attempts} attempts", hive.display())]
    HiveLoad {
        /// Hive file.
        hive: PathBuf,
        /// Attempts made.
        attempts: u32,
        /// Last collaborator failure.
        source: CollaboratorError,
    },
    /// A configured subtree could not be checked or deleted.
    #[error("registry subtree '{key}' not removed")]
    Subtree {
        /// Fully qualified key.
        key: String,
        /// Collaborator failure.
        source: CollaboratorError,
    },
    /// The hive stayed mounted after every unload attempt.
    #[error("hive namespace '{namespace}' left mounted after {attempts} unload attempts")]
    HiveLeftMounted {
        /// Namespace the hive is still loaded under.
        namespace: String,
        /// Attempts made.
        attempts: u32,
        /// Last collaborator failure.
        source: CollaboratorError,
    },
    /// The namespace root survived the unload and could not be removed.
    #[error("hive namespace root '{namespace}' not removed")]
    NamespaceRoot {
        /// Namespace root key.
        namespace: String,
        /// Collaborator failure.
        source: CollaboratorError,
    },
    /// A file matched for removal could not be deleted.
    #[error("cleanup failed on '{}'", path.display())]
    Cleanup {
        /// Path that could not be removed.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl NormalizeError {
    /// Category used in reports and logs.
    #[must_use]
    pub const fn kind(&self) -> WarningKind {
        match self {
            Self::Ownership { .. } => WarningKind::Ownership,
            Self::HiveLoad { .. } => WarningKind::HiveLoad,
            Self::Subtree { .. } => WarningKind::Subtree,
            Self::HiveLeftMounted { .. } => WarningKind::HiveLeftMounted,
            Self::NamespaceRoot { .. } => WarningKind::NamespaceRoot,
            Self::Cleanup { .. } => WarningKind::Cleanup,
        }
    }
}

/// Category of a normalization warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Ownership or ACL edit failed.
    Ownership,
    /// Hive could not be loaded.
    HiveLoad,
    /// Subtree removal failed.
    Subtree,
    /// Hive left mounted.
    HiveLeftMounted,
    /// Namespace root left behind.
    NamespaceRoot,
    /// File removal failed.
    Cleanup,
}

impl WarningKind {
    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ownership => "ownership",
            Self::HiveLoad => "hive_load",
            Self::Subtree => "subtree",
            Self::HiveLeftMounted => "hive_left_mounted",
            Self::NamespaceRoot => "namespace_root",
            Self::Cleanup => "cleanup",
        }
    }
}

/// Non-fatal normalization problem surfaced on the profile outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizationWarning {
    /// Category.
    pub kind: WarningKind,
    /// Human-readable description including the underlying cause.
    pub message: String,
}

impl From<&NormalizeError> for NormalizationWarning {
    fn from(error: &NormalizeError) -> Self {
        let message = match error.source() {
            Some(source) => format!("{error}: {source}"),
            None => error.to_string(),
        };
        Self {
            kind: error.kind(),
            message,
        }
    }
}

impl From<NormalizeError> for NormalizationWarning {
    fn from(error: NormalizeError) -> Self {
        Self::from(&error)
    }
}

impl Display for NormalizationWarning {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "[{}] {}", self.kind.as_str(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_include_cause_and_kind() {
        let error = NormalizeError::HiveLeftMounted {
            namespace: "HKU\\PROFMIG_1".into(),
            attempts: 3,
            source: CollaboratorError::rejected("unload", "access is denied"),
        };
        let warning = NormalizationWarning::from(error);
        assert_eq!(warning.kind, WarningKind::HiveLeftMounted);
        assert_eq!(
            warning.to_string(),
            "[hive_left_mounted] hive namespace 'HKU\\PROFMIG_1' left mounted after 3 unload attempts: unload rejected: access is denied"
        );
    }

    #[test]
    fn warnings_serialize_with_snake_case_kind() -> serde_json::Result<()> {
        let warning = NormalizationWarning::from(NormalizeError::Cleanup {
            path: PathBuf::from("Desktop/Thumbs.db"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        });
        let value = serde_json::to_value(&warning)?;
        assert_eq!(value["kind"], "cleanup");
        Ok(())
    }
}
