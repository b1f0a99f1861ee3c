use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Terminal state of one profile in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProfileOutcome {
    /// Every stage finished without warnings.
    Succeeded,
    /// Data was migrated but a transfer or normalization step raised warnings.
    CompletedWithWarnings {
        /// Warnings collected along the way.
        warnings: Vec<String>,
    },
    /// The target was already fully migrated.
    Skipped {
        /// Why the profile was not processed.
        reason: String,
    },
    /// A stage failed; later stages were not attempted.
    Failed {
        /// Stage that failed.
        stage: String,
        /// Failure description.
        message: String,
    },
    /// Identity could not be resolved; nothing was attempted.
    Unresolvable,
}

impl ProfileOutcome {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::CompletedWithWarnings { .. } => "completed_with_warnings",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
            Self::Unresolvable => "unresolvable",
        }
    }
}

/// Profile that failed, with the failing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedProfile {
    /// Source profile path.
    pub path: String,
    /// Stage that failed.
    pub stage: String,
    /// Failure description.
    pub message: String,
}

/// Profile that completed with warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarnedProfile {
    /// Source profile path.
    pub path: String,
    /// Warnings raised while migrating the profile.
    pub warnings: Vec<String>,
}

/// Aggregate result of a batch run. Produced once by [`BatchReportBuilder::finish`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    total: usize,
    eligible: usize,
    succeeded: Vec<String>,
    completed_with_warnings: Vec<WarnedProfile>,
    skipped: Vec<String>,
    failed: Vec<FailedProfile>,
    unresolvable: Vec<String>,
}

impl BatchReport {
    /// Identifier of the run.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// When the batch started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the batch finished.
    #[must_use]
    pub const fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Wall-clock duration of the batch.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.finished_at - self.started_at
    }

    /// Number of profiles in the batch.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Number of profiles with a resolvable target.
    #[must_use]
    pub const fn eligible(&self) -> usize {
        self.eligible
    }

    /// Profiles migrated cleanly, in input order.
    #[must_use]
    pub fn succeeded(&self) -> &[String] {
        &self.succeeded
    }

    /// Profiles migrated with warnings, in input order.
    #[must_use]
    pub fn completed_with_warnings(&self) -> &[WarnedProfile] {
        &self.completed_with_warnings
    }

    /// Profiles skipped because their target was already migrated.
    #[must_use]
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Profiles that failed, in input order.
    #[must_use]
    pub fn failed(&self) -> &[FailedProfile] {
        &self.failed
    }

    /// Profiles whose identity could not be resolved.
    #[must_use]
    pub fn unresolvable(&self) -> &[String] {
        &self.unresolvable
    }

    /// Profiles whose data reached the target, with or without warnings.
    #[must_use]
    pub fn migrated_count(&self) -> usize {
        self.succeeded.len() + self.completed_with_warnings.len()
    }

    /// True when nothing failed, warned or was unresolvable.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.completed_with_warnings.is_empty()
            && self.failed.is_empty()
            && self.unresolvable.is_empty()
    }
}

/// Accumulates per-profile outcomes in input order.
#[derive(Debug)]
pub struct BatchReportBuilder {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    total: usize,
    eligible: usize,
    succeeded: Vec<String>,
    completed_with_warnings: Vec<WarnedProfile>,
    skipped: Vec<String>,
    failed: Vec<FailedProfile>,
    unresolvable: Vec<String>,
}

impl BatchReportBuilder {
    /// Start a report for a new run.
    #[must_use]
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            total: 0,
            eligible: 0,
            succeeded: Vec::new(),
            completed_with_warnings: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            unresolvable: Vec::new(),
        }
    }

    /// Record the terminal outcome of one planned profile. Each profile lands in exactly one bucket;
    /// every outcome except `Unresolvable` counts as eligible.
    pub fn record(&mut self, source: &Path, outcome: &ProfileOutcome) {
        if !matches!(outcome, ProfileOutcome::Unresolvable) {
            self.eligible += 1;
        }
        self.push(source, outcome);
    }

    /// Record a source that never became a plan (no usable folder name).
    /// It counts toward the total but is never eligible.
    pub fn record_unplanned(&mut self, source: &Path, outcome: &ProfileOutcome) {
        self.push(source, outcome);
    }

    fn push(&mut self, source: &Path, outcome: &ProfileOutcome) {
        let path = source.display().to_string();
        self.total += 1;
        match outcome {
            ProfileOutcome::Succeeded => self.succeeded.push(path),
            ProfileOutcome::CompletedWithWarnings { warnings } => {
                self.completed_with_warnings.push(WarnedProfile {
                    path,
                    warnings: warnings.clone(),
                });
            }
            ProfileOutcome::Skipped { .. } => self.skipped.push(path),
            ProfileOutcome::Failed { stage, message } => self.failed.push(FailedProfile {
                path,
                stage: stage.clone(),
                message: message.clone(),
            }),
            ProfileOutcome::Unresolvable => self.unresolvable.push(path),
        }
    }

    /// Close the report.
    #[must_use]
    pub fn finish(self) -> BatchReport {
        BatchReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            total: self.total,
            eligible: self.eligible,
            succeeded: self.succeeded,
            completed_with_warnings: self.completed_with_warnings,
            skipped: self.skipped,
            failed: self.failed,
            unresolvable: self.unresolvable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_partition_the_batch() {
        let mut builder = BatchReportBuilder::new(Uuid::nil());
        builder.record(Path::new("/p/a"), &ProfileOutcome::Succeeded);
        builder.record(Path::new("/p/b"), &ProfileOutcome::Unresolvable);
        builder.record(
            Path::new("/p/c"),
            &ProfileOutcome::Failed {
                stage: "transfer".into(),
                message: "exit 8".into(),
            },
        );
        builder.record(
            Path::new("/p/d"),
            &ProfileOutcome::Skipped {
                reason: "already migrated".into(),
            },
        );
        builder.record(
            Path::new("/p/e"),
            &ProfileOutcome::CompletedWithWarnings {
                warnings: vec!["hive left mounted".into()],
            },
        );

        let report = builder.finish();
        assert_eq!(report.total(), 5);
        assert_eq!(report.eligible(), 4);
        assert_eq!(
            report.migrated_count()
                + report.skipped().len()
                + report.failed().len()
                + report.unresolvable().len(),
            report.total()
        );
        assert_eq!(report.failed()[0].stage, "transfer");
        assert!(!report.is_clean());
        assert!(report.elapsed() >= Duration::zero());
    }

    #[test]
    fn unplanned_sources_count_toward_total_but_not_eligible() {
        let mut builder = BatchReportBuilder::new(Uuid::nil());
        builder.record(Path::new("/p/jdoe.V6"), &ProfileOutcome::Succeeded);
        builder.record_unplanned(
            Path::new(""),
            &ProfileOutcome::Failed {
                stage: "plan".into(),
                message: "profile path has no usable folder name".into(),
            },
        );

        let report = builder.finish();
        assert_eq!(report.total(), 2);
        assert_eq!(report.eligible(), 1);
        assert_eq!(report.failed().len(), 1);
        assert_eq!(report.failed()[0].stage, "plan");
    }

    #[test]
    fn report_serializes_bucket_lists() -> anyhow::Result<()> {
        let mut builder = BatchReportBuilder::new(Uuid::nil());
        builder.record(Path::new("/p/a"), &ProfileOutcome::Succeeded);
        let value = serde_json::to_value(builder.finish())?;
        assert_eq!(value["succeeded"][0], "/p/a");
        assert_eq!(value["total"], 1);
        Ok(())
    }
}
