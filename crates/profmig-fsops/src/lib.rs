#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Filesystem work performed on an attached profile container.
//!
//! Layout: `transfer.rs` (mirror with accounting and home-folder merge),
//! `robocopy.rs` (mirror tool adapter and summary parsing), `rules.rs`
//! (exclusion and removal glob rules), `permissions.rs` (ownership and ACL
//! propagation), `hive.rs` (offline registry hive normalization),
//! `cleanup.rs` (post-copy file removal), `error.rs`.

pub mod cleanup;
pub mod error;
pub mod hive;
pub mod permissions;
pub mod robocopy;
pub mod rules;
pub mod transfer;

pub use cleanup::{CleanupReport, remove_matching};
pub use error::{NormalizationWarning, NormalizeError, RuleError, TransferError, WarningKind};
pub use hive::{HiveNormalizer, HiveReport, RegHiveStore, namespace_for};
pub use permissions::{IcaclsEditor, OwnershipPropagator};
pub use robocopy::{MirrorSummary, RobocopyTool, parse_summary, robocopy_args};
pub use rules::{ExclusionRules, RemovalRules, RuleDecision};
pub use transfer::{HOME_FOLDER_DESTINATION, TransferEngine};
