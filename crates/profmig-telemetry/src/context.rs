//! Span helpers for the run and for individual profiles.
//!
//! # Design
//! - The run span is entered once for the lifetime of the process and carries the run id.
//! - Each profile gets its own span so every component log line names the profile it belongs to.

use std::path::Path;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the run-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the run-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("run", run_id = %run_id, build_sha = %build_sha()),
        ));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Span covering every stage of one profile.
#[must_use]
pub fn profile_span(source: &Path, username: &str) -> Span {
    tracing::info_span!(
        "profile",
        source = %source.display(),
        user = %username
    )
}
