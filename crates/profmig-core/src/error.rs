//! # Design
//!
//! - Give every collaborator port one error type so adapters and fakes agree.
//! - Carry the program, operation and exit status so failures are reproducible.
//! - Keep model validation errors separate from collaborator failures.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for collaborator calls.
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Result alias for model construction.
pub type ModelResult<T> = Result<T, ModelError>;

/// Failures reported by external collaborators (directory, storage, mirror, ACL, hive).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The external program could not be started.
    #[error("failed to start '{program}'")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The external program exited unsuccessfully.
    #[error("'{program}' failed during {operation} (exit code {code:?})")]
    CommandFailed {
        /// Program that reported the failure.
        program: String,
        /// Operation the program was performing.
        operation: &'static str,
        /// Exit code when the process terminated normally.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },
    /// The external program succeeded but its output could not be interpreted.
    #[error("'{program}' produced unexpected output during {operation}")]
    UnexpectedOutput {
        /// Program that produced the output.
        program: String,
        /// Operation the program was performing.
        operation: &'static str,
        /// Raw output that failed to parse.
        output: String,
    },
    /// Local filesystem failure inside a collaborator.
    #[error("io failure during {operation}")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The collaborator refused the request.
    #[error("{operation} rejected: {detail}")]
    Rejected {
        /// Operation that was rejected.
        operation: &'static str,
        /// Collaborator-provided detail.
        detail: String,
    },
}

impl CollaboratorError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Build a rejection error; used by adapters and in-memory fakes.
    #[must_use]
    pub fn rejected(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            detail: detail.into(),
        }
    }
}

/// Validation failures when constructing domain values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// A value failed validation.
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn collaborator_helpers_build_variants() {
        let io_err = CollaboratorError::io("list", "C:\\missing", io::Error::other("io"));
        assert!(matches!(io_err, CollaboratorError::Io { .. }));
        assert!(io_err.source().is_some());

        let rejected = CollaboratorError::rejected("attach", "already attached");
        assert_eq!(rejected.to_string(), "attach rejected: already attached");
    }

    #[test]
    fn command_failure_renders_exit_code() {
        let err = CollaboratorError::CommandFailed {
            program: "robocopy".into(),
            operation: "mirror",
            code: Some(16),
            stderr: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "'robocopy' failed during mirror (exit code Some(16))"
        );
    }
}
