//! Domain models shared by the migration components.
//!
//! # Design
//! - Records handed between stages are immutable once built; fields are read through accessors.
//! - Value objects (`TransferResult`, `MountPoint`) stay plain and cheap to clone.
//! - Anything persisted or reported derives `Serialize`.

mod identity;
mod profile;
mod report;
mod transfer;
mod volume;

pub use identity::{AccountIdentity, SecurityIdentifier};
pub use profile::{ComponentOrder, DiskFormat, ProfileRecord, TargetPath, UNRESOLVABLE_SENTINEL};
pub use report::{BatchReport, BatchReportBuilder, FailedProfile, ProfileOutcome, WarnedProfile};
pub use transfer::{MirrorOutput, MirrorRequest, TransferOutcome, TransferResult};
pub use volume::{BlockSize, MountPoint, VolumeHandle};
