#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Per-user container provisioning and attachment.
//!
//! Layout: `provisioner.rs` (create-or-attach with cleanup and the attachment
//! registry), `mount.rs` (stable mount designator resolution),
//! `powershell.rs` (Hyper-V storage adapter), `error.rs`.

pub mod error;
pub mod mount;
pub mod powershell;
pub mod provisioner;

pub use error::{ProvisioningError, ProvisioningResult};
pub use mount::{MountPolicy, resolve_mount};
pub use powershell::PowerShellBlockStorage;
pub use provisioner::{DiskProvisioner, find_existing_backing, volume_label};
