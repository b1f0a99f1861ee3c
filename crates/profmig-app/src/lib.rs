#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Profile migration batch wiring.
//!
//! Layout: `bootstrap.rs` (collaborator wiring and output files),
//! `orchestrator.rs` (batch loop and report), `pipeline.rs` (per-profile
//! stages), `journal.rs` (per-target step journal), `error.rs`.

/// Batch bootstrap and collaborator wiring.
pub mod bootstrap;
/// Application error type.
pub mod error;
/// Per-target migration journal.
pub mod journal;
/// Batch orchestration.
pub mod orchestrator;
/// Per-profile stage pipeline.
pub mod pipeline;

pub use bootstrap::{
    BootstrapDependencies, Collaborators, build_orchestrator, run_app, run_app_with, write_metrics, write_report,
};
pub use error::{AppError, AppResult};
pub use journal::{JOURNAL_DIR_NAME, MigrationJournal, StepKind, StepStatus, journal_path};
pub use orchestrator::{BatchOrchestrator, PLAN_STAGE};
pub use pipeline::{ALREADY_MIGRATED, PipelineSettings, PipelineStages, ProfilePipeline};
