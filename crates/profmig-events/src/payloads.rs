//! Event payloads emitted while a batch runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to each event emitted during a run.
pub type EventId = u64;

/// Typed progress events surfaced by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A batch started.
    BatchStarted {
        /// Identifier of the run.
        run_id: Uuid,
        /// Number of profiles in the batch.
        total: usize,
    },
    /// A profile entered the pipeline.
    ProfileStarted {
        /// Source profile path.
        source: String,
        /// Derived username.
        username: String,
        /// Target backing-file path or sentinel.
        target: String,
    },
    /// A profile moved to a new stage.
    StageProgress {
        /// Source profile path.
        source: String,
        /// Stage label.
        stage: String,
    },
    /// A profile reached its terminal state.
    ProfileFinished {
        /// Source profile path.
        source: String,
        /// Terminal outcome label.
        outcome: String,
        /// Failure or warning detail when present.
        detail: Option<String>,
    },
    /// A batch finished.
    BatchCompleted {
        /// Identifier of the run.
        run_id: Uuid,
        /// Profiles migrated cleanly.
        succeeded: usize,
        /// Profiles migrated with warnings.
        completed_with_warnings: usize,
        /// Profiles skipped as already migrated.
        skipped: usize,
        /// Profiles that failed.
        failed: usize,
        /// Profiles whose identity could not be resolved.
        unresolvable: usize,
    },
}

impl Event {
    /// Machine-friendly discriminator for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BatchStarted { .. } => "batch_started",
            Self::ProfileStarted { .. } => "profile_started",
            Self::StageProgress { .. } => "stage_progress",
            Self::ProfileFinished { .. } => "profile_finished",
            Self::BatchCompleted { .. } => "batch_completed",
        }
    }

    /// Source profile path for per-profile events.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::ProfileStarted { source, .. }
            | Self::StageProgress { source, .. }
            | Self::ProfileFinished { source, .. } => Some(source),
            Self::BatchStarted { .. } | Self::BatchCompleted { .. } => None,
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}
