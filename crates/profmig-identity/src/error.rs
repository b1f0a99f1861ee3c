//! Errors raised by identity resolution.

use thiserror::Error;

/// Result alias for identity resolution.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Failures that prevent a lookup from being attempted at all.
///
/// A lookup that runs and finds nothing is `Ok(None)`, not an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The lookup inputs are unusable.
    #[error("identity lookup misconfigured: {field} {reason}")]
    Configuration {
        /// Input that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
}
