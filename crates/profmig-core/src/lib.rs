#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared domain model and collaborator ports for profile migration.
//!
//! Layout: `model/` (profile records, volume handles, transfer results, batch
//! report), `service/` (async collaborator traits and profile sources),
//! `process.rs` (external command runner), `error.rs` (collaborator and model
//! errors).

pub mod error;
pub mod model;
pub mod process;
pub mod service;

pub use error::{CollaboratorError, CollaboratorResult, ModelError, ModelResult};
pub use model::{
    AccountIdentity, BatchReport, BatchReportBuilder, BlockSize, ComponentOrder, DiskFormat,
    FailedProfile, MirrorOutput, MirrorRequest, MountPoint, ProfileOutcome, ProfileRecord,
    SecurityIdentifier, TargetPath, TransferOutcome, TransferResult, UNRESOLVABLE_SENTINEL,
    VolumeHandle, WarnedProfile,
};
pub use process::{CommandOutput, ProcessRunner, SystemProcessRunner};
pub use service::{
    AccountTranslator, AclEditor, BlockStorage, DirectoryEntry, DirectoryProfileSource,
    DirectoryQuery, DirectoryService, HiveStore, MirrorTool, ProfileSource, StaticProfileSource,
};
