//! Batch orchestration: plan every profile, then run them one at a time.
//!
//! # Design
//! - Profiles are processed strictly in input order on the calling task.
//! - Planning happens up front so the batch size and every target are known
//!   before the first container is touched.
//! - Unresolvable records never reach a stage; each profile lands in exactly
//!   one report bucket.

use std::path::{Path, PathBuf};

use profmig_core::{BatchReport, BatchReportBuilder, ProfileOutcome, ProfileRecord};
use profmig_events::{Event, EventBus};
use profmig_identity::MigrationPlanner;
use profmig_telemetry::{Metrics, profile_span};
use tracing::{Instrument, info, warn};
use uuid::Uuid;

use crate::pipeline::ProfilePipeline;

/// Stage label for paths that could not be planned.
pub const PLAN_STAGE: &str = "plan";

/// Drives a batch of profiles through planning and the per-profile pipeline.
pub struct BatchOrchestrator {
    planner: MigrationPlanner,
    pipeline: ProfilePipeline,
    events: EventBus,
    metrics: Metrics,
}

impl BatchOrchestrator {
    /// Assemble the orchestrator.
    #[must_use]
    pub fn new(planner: MigrationPlanner, pipeline: ProfilePipeline, events: EventBus, metrics: Metrics) -> Self {
        Self {
            planner,
            pipeline,
            events,
            metrics,
        }
    }

    /// Pipeline used for resolvable profiles.
    #[must_use]
    pub const fn pipeline(&self) -> &ProfilePipeline {
        &self.pipeline
    }

    /// Migrate every profile in `sources` and report the outcome of each.
    pub async fn run(&self, run_id: Uuid, sources: &[PathBuf]) -> BatchReport {
        info!(%run_id, total = sources.len(), "batch started");
        self.publish_event(Event::BatchStarted {
            run_id,
            total: sources.len(),
        });

        let mut planned = Vec::with_capacity(sources.len());
        for source in sources {
            planned.push((source.as_path(), self.planner.plan(source).await));
        }

        let mut report = BatchReportBuilder::new(run_id);
        for (source, record) in planned {
            if let Some(record) = record {
                let span = profile_span(source, record.username());
                let outcome = self.process(&record).instrument(span).await;
                self.finish_profile(source, &outcome);
                report.record(source, &outcome);
            } else {
                let outcome = ProfileOutcome::Failed {
                    stage: PLAN_STAGE.to_string(),
                    message: "profile path yields no username".to_string(),
                };
                self.finish_profile(source, &outcome);
                report.record_unplanned(source, &outcome);
            }
        }

        let report = report.finish();
        info!(
            %run_id,
            total = report.total(),
            eligible = report.eligible(),
            succeeded = report.succeeded().len(),
            completed_with_warnings = report.completed_with_warnings().len(),
            skipped = report.skipped().len(),
            failed = report.failed().len(),
            unresolvable = report.unresolvable().len(),
            elapsed_ms = report.elapsed().num_milliseconds(),
            "batch finished"
        );
        self.publish_event(Event::BatchCompleted {
            run_id,
            succeeded: report.succeeded().len(),
            completed_with_warnings: report.completed_with_warnings().len(),
            skipped: report.skipped().len(),
            failed: report.failed().len(),
            unresolvable: report.unresolvable().len(),
        });
        report
    }

    async fn process(&self, record: &ProfileRecord) -> ProfileOutcome {
        self.publish_event(Event::ProfileStarted {
            source: record.source_path().display().to_string(),
            username: record.username().to_string(),
            target: record.target().to_string(),
        });
        if record.target().is_unresolvable() {
            warn!("identity could not be resolved; profile will not be migrated");
            return ProfileOutcome::Unresolvable;
        }
        self.pipeline.run(record).await
    }

    fn finish_profile(&self, source: &Path, outcome: &ProfileOutcome) {
        self.metrics.inc_profile(outcome.as_str());
        let detail = match outcome {
            ProfileOutcome::Failed { stage, message } => {
                warn!(source = %source.display(), stage = %stage, error = %message, "profile failed");
                Some(format!("{stage}: {message}"))
            }
            ProfileOutcome::CompletedWithWarnings { warnings } => {
                warn!(source = %source.display(), warnings = warnings.len(), "profile migrated with warnings");
                Some(warnings.join("; "))
            }
            ProfileOutcome::Skipped { reason } => {
                info!(source = %source.display(), reason = %reason, "profile skipped");
                Some(reason.clone())
            }
            ProfileOutcome::Succeeded | ProfileOutcome::Unresolvable => {
                info!(source = %source.display(), outcome = outcome.as_str(), "profile finished");
                None
            }
        };
        self.publish_event(Event::ProfileFinished {
            source: source.display().to_string(),
            outcome: outcome.as_str().to_string(),
            detail,
        });
    }

    fn publish_event(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        self.events.publish(event);
    }
}
