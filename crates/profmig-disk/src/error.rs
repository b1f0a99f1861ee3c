//! # Design
//!
//! - One error type per provisioning failure mode, each carrying the backing path.
//! - Collaborator failures keep the storage operation that raised them.

use std::io;
use std::path::PathBuf;

use profmig_core::CollaboratorError;
use thiserror::Error;

/// Result alias for provisioning operations.
pub type ProvisioningResult<T> = Result<T, ProvisioningError>;

/// Failures while creating, attaching or releasing a container.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// The record carries the unresolvable sentinel.
    #[error("profile '{}' has no resolved target", source_path.display())]
    Unresolvable {
        /// Source profile path.
        source_path: PathBuf,
    },
    /// Another handle for the same backing file is live.
    #[error("container '{}' is already attached", path.display())]
    AlreadyAttached {
        /// Backing file path.
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
    /// The block storage collaborator failed.
    #[error("storage {operation} failed for '{}'", path.display())]
    Storage {
        /// Storage operation that failed.
        operation: &'static str,
        /// Backing file path.
        path: PathBuf,
        /// Collaborator failure.
        source: CollaboratorError,
    },
    /// No non-empty designator set stabilised within the polling budget.
    #[error("no stable mount designator for '{}' after {attempts} polls", path.display())]
    MountUnavailable {
        /// Backing file path.
        path: PathBuf,
        /// Polls performed.
        attempts: u32,
    },
    /// Several reachable designators remained for one container.
    #[error("ambiguous mount designators for '{}': {}", path.display(), designators.join(", "))]
    AmbiguousMount {
        /// Backing file path.
        path: PathBuf,
        /// Designators observed.
        designators: Vec<String>,
    },
    /// Granting the profile owner access to the backing file failed.
    #[error("ownership bootstrap for {principal} failed on '{}'", path.display())]
    Ownership {
        /// Backing file path.
        path: PathBuf,
        /// Principal that was being granted access.
        principal: String,
        /// Collaborator failure.
        source: CollaboratorError,
    },
}

impl ProvisioningError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn storage(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: CollaboratorError,
    ) -> Self {
        Self::Storage {
            operation,
            path: path.into(),
            source,
        }
    }
}
