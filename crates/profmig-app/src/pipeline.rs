//! Per-profile pipeline: provision, transfer, normalize, release.
//!
//! # Design
//! - A stage failure ends the profile as `Failed` with the stage name; the
//!   container is still released.
//! - Normalization problems and non-clean transfers become warnings, never failures.
//! - Every step transition is journaled, counted and published as progress.

use std::error::Error as StdError;
use std::path::{Path, PathBuf};

use profmig_config::MigrationConfig;
use profmig_core::{AccountIdentity, BlockSize, ProfileOutcome, ProfileRecord, TransferOutcome, TransferResult, VolumeHandle};
use profmig_disk::DiskProvisioner;
use profmig_events::{Event, EventBus};
use profmig_fsops::{
    HiveNormalizer, NormalizationWarning, NormalizeError, OwnershipPropagator, RemovalRules, TransferEngine,
    remove_matching,
};
use profmig_telemetry::Metrics;
use tracing::{error, info, warn};

use crate::journal::{MigrationJournal, StepKind, StepStatus};

/// Skip reason recorded for targets whose journal is complete.
pub const ALREADY_MIGRATED: &str = "already migrated";

/// Batch-wide inputs of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Root that receives containers and journals.
    pub target_root: PathBuf,
    /// Share of per-user home folders, when merged.
    pub home_root: Option<PathBuf>,
    /// Container size quota.
    pub size_bytes: u64,
    /// Container sector size.
    pub block_size: BlockSize,
    /// Process completed targets again in incremental mode.
    pub resync_completed: bool,
}

impl PipelineSettings {
    /// Take the pipeline slice of a batch configuration.
    #[must_use]
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self {
            target_root: config.target_root.clone(),
            home_root: config.home_root.clone(),
            size_bytes: config.disk.size_bytes,
            block_size: config.disk.block_size,
            resync_completed: config.resync_completed,
        }
    }
}

/// Stage components used by the pipeline.
pub struct PipelineStages {
    /// Container provisioning.
    pub provisioner: DiskProvisioner,
    /// Mirror passes.
    pub transfer: TransferEngine,
    /// Ownership propagation.
    pub ownership: OwnershipPropagator,
    /// Hive normalization.
    pub hive: HiveNormalizer,
    /// Post-copy removals.
    pub removal: RemovalRules,
}

/// Runs one resolvable profile through every stage.
pub struct ProfilePipeline {
    stages: PipelineStages,
    settings: PipelineSettings,
    events: EventBus,
    metrics: Metrics,
}

struct StageFailure {
    stage: StepKind,
    message: String,
}

impl ProfilePipeline {
    /// Assemble the pipeline.
    #[must_use]
    pub fn new(stages: PipelineStages, settings: PipelineSettings, events: EventBus, metrics: Metrics) -> Self {
        Self {
            stages,
            settings,
            events,
            metrics,
        }
    }

    /// Whether a container is still attached for `backing_path`.
    #[must_use]
    pub fn is_attached(&self, backing_path: &Path) -> bool {
        self.stages.provisioner.is_attached(backing_path)
    }

    /// Migrate one profile and return its terminal outcome.
    pub async fn run(&self, record: &ProfileRecord) -> ProfileOutcome {
        let Some((target, identity)) = record.migration_target() else {
            return ProfileOutcome::Unresolvable;
        };

        let mut journal = match MigrationJournal::open(&self.settings.target_root, record, target) {
            Ok(journal) => journal,
            Err(err) => {
                error!(error = %err, "failed to open migration journal");
                return ProfileOutcome::Failed {
                    stage: "journal".to_string(),
                    message: describe(&err),
                };
            }
        };
        if journal.completed && !self.settings.resync_completed {
            info!(journal = %journal.path().display(), "target already migrated; skipping");
            return ProfileOutcome::Skipped {
                reason: ALREADY_MIGRATED.to_string(),
            };
        }
        if let Err(err) = journal.begin_run() {
            error!(error = %err, "failed to persist migration journal");
            return ProfileOutcome::Failed {
                stage: "journal".to_string(),
                message: describe(&err),
            };
        }

        self.record_step(record, &mut journal, StepKind::Provision, StepStatus::Started, None);
        let handle = match self
            .stages
            .provisioner
            .provision_or_attach(record, self.settings.size_bytes, self.settings.block_size)
            .await
        {
            Ok(handle) => handle,
            Err(err) => {
                let message = describe(&err);
                error!(error = %message, "provisioning failed");
                self.record_step(record, &mut journal, StepKind::Provision, StepStatus::Failed, Some(message.clone()));
                return ProfileOutcome::Failed {
                    stage: StepKind::Provision.as_str().to_string(),
                    message,
                };
            }
        };
        let mode = if handle.freshly_created() { "created" } else { "attached" };
        self.record_step(
            record,
            &mut journal,
            StepKind::Provision,
            StepStatus::Completed,
            Some(format!("{mode} {}", handle.mount_point())),
        );

        let migrated = self.migrate(record, identity, &handle, &mut journal).await;
        self.release(record, &mut journal, handle).await;

        match migrated {
            Ok(mut warnings) => {
                if let Err(err) = journal.complete() {
                    error!(error = %err, "failed to mark migration journal complete");
                    warnings.push(format!("journal not updated: {}", describe(&err)));
                }
                if warnings.is_empty() {
                    ProfileOutcome::Succeeded
                } else {
                    ProfileOutcome::CompletedWithWarnings { warnings }
                }
            }
            Err(failure) => ProfileOutcome::Failed {
                stage: failure.stage.as_str().to_string(),
                message: failure.message,
            },
        }
    }

    async fn migrate(
        &self,
        record: &ProfileRecord,
        identity: &AccountIdentity,
        handle: &VolumeHandle,
        journal: &mut MigrationJournal,
    ) -> Result<Vec<String>, StageFailure> {
        let profile_root = handle.profile_root();
        let existing_target = !handle.freshly_created();
        let mut warnings = Vec::new();

        self.record_step(record, journal, StepKind::Transfer, StepStatus::Started, None);
        let transferred = self
            .stages
            .transfer
            .mirror(record.source_path(), &profile_root, existing_target)
            .await;
        match transferred {
            Ok(result) => self.account_transfer(record, journal, StepKind::Transfer, &result, &mut warnings),
            Err(err) => return Err(self.fail_step(record, journal, StepKind::Transfer, &err)),
        }

        if let Some(home_root) = &self.settings.home_root {
            self.record_step(record, journal, StepKind::MergeHome, StepStatus::Started, None);
            let merged = self
                .stages
                .transfer
                .merge_home(home_root, record.username(), &profile_root, existing_target)
                .await;
            match merged {
                Ok(Some(result)) => {
                    self.account_transfer(record, journal, StepKind::MergeHome, &result, &mut warnings);
                }
                Ok(None) => self.record_step(
                    record,
                    journal,
                    StepKind::MergeHome,
                    StepStatus::Skipped,
                    Some("no home folder".to_string()),
                ),
                Err(err) => return Err(self.fail_step(record, journal, StepKind::MergeHome, &err)),
            }
        }

        self.record_step(record, journal, StepKind::Ownership, StepStatus::Started, None);
        let failures = self
            .stages
            .ownership
            .apply(&profile_root, handle.backing_path(), identity)
            .await;
        self.finish_normalization(record, journal, StepKind::Ownership, failures, &mut warnings);

        self.record_step(record, journal, StepKind::Hive, StepStatus::Started, None);
        let report = self.stages.hive.normalize(&profile_root).await;
        for _ in 0..report.retries {
            self.metrics.inc_hive_retry();
        }
        if report.skipped {
            self.record_step(
                record,
                journal,
                StepKind::Hive,
                StepStatus::Skipped,
                Some("no hive file".to_string()),
            );
        } else {
            self.finish_normalization(record, journal, StepKind::Hive, report.warnings, &mut warnings);
        }

        self.record_step(record, journal, StepKind::Cleanup, StepStatus::Started, None);
        let cleanup = remove_matching(&profile_root, &self.stages.removal);
        info!(removed = cleanup.removed, "post-copy cleanup finished");
        self.finish_normalization(record, journal, StepKind::Cleanup, cleanup.failures, &mut warnings);

        Ok(warnings)
    }

    async fn release(&self, record: &ProfileRecord, journal: &mut MigrationJournal, handle: VolumeHandle) {
        self.record_step(record, journal, StepKind::Release, StepStatus::Started, None);
        match self.stages.provisioner.release(handle).await {
            Ok(()) => self.record_step(record, journal, StepKind::Release, StepStatus::Completed, None),
            Err(err) => {
                let message = describe(&err);
                warn!(error = %message, "container detach failed; leaving it attached");
                self.record_step(record, journal, StepKind::Release, StepStatus::Failed, Some(message));
            }
        }
    }

    fn account_transfer(
        &self,
        record: &ProfileRecord,
        journal: &mut MigrationJournal,
        step: StepKind,
        result: &TransferResult,
        warnings: &mut Vec<String>,
    ) {
        self.metrics.add_bytes_transferred(result.bytes_copied);
        journal.add_bytes(result.bytes_copied);
        let detail = format!(
            "{} of {} files, {} bytes copied",
            result.files_copied, result.files_total, result.bytes_copied
        );
        if result.outcome == TransferOutcome::CompletedWithWarnings {
            warnings.push(format!(
                "{}: mirror reported mismatches or extra entries (exit code {})",
                step.as_str(),
                result.exit_code.unwrap_or_default()
            ));
            self.record_step(record, journal, step, StepStatus::Warned, Some(detail));
        } else {
            self.record_step(record, journal, step, StepStatus::Completed, Some(detail));
        }
    }

    fn finish_normalization(
        &self,
        record: &ProfileRecord,
        journal: &mut MigrationJournal,
        step: StepKind,
        failures: Vec<NormalizeError>,
        warnings: &mut Vec<String>,
    ) {
        if failures.is_empty() {
            self.record_step(record, journal, step, StepStatus::Completed, None);
            return;
        }
        let rendered: Vec<String> = failures
            .iter()
            .map(|failure| NormalizationWarning::from(failure).to_string())
            .collect();
        for warning in &rendered {
            warn!(step = step.as_str(), warning = %warning, "normalization warning");
        }
        self.record_step(
            record,
            journal,
            step,
            StepStatus::Warned,
            Some(format!("{} warning(s)", rendered.len())),
        );
        warnings.extend(rendered);
    }

    fn fail_step(
        &self,
        record: &ProfileRecord,
        journal: &mut MigrationJournal,
        step: StepKind,
        err: &(dyn StdError + 'static),
    ) -> StageFailure {
        let message = describe(err);
        error!(step = step.as_str(), error = %message, "stage failed");
        self.record_step(record, journal, step, StepStatus::Failed, Some(message.clone()));
        StageFailure { stage: step, message }
    }

    fn record_step(
        &self,
        record: &ProfileRecord,
        journal: &mut MigrationJournal,
        step: StepKind,
        status: StepStatus,
        detail: Option<String>,
    ) {
        match journal.record(step, status, detail) {
            Ok(true) => self.metrics.inc_pipeline_step(step.as_str(), status.as_str()),
            Ok(false) => {}
            Err(err) => {
                error!(error = %err, step = step.as_str(), "failed to persist journal step");
                self.metrics.inc_pipeline_step(step.as_str(), status.as_str());
            }
        }
        if status == StepStatus::Started {
            self.publish_event(Event::StageProgress {
                source: record.source_path().display().to_string(),
                stage: step.as_str().to_string(),
            });
        }
    }

    fn publish_event(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        self.events.publish(event);
    }
}

/// Render an error with its source chain on one line.
pub(crate) fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::error::AppError;

    #[test]
    fn describe_walks_the_source_chain() {
        let err = AppError::io("journal.write", "/t/.profmig/x.meta.json", io::Error::other("disk full"));
        assert_eq!(describe(&err), "io operation failed: disk full");
    }
}
