#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Identity resolution and migration planning.
//!
//! Layout: `resolver.rs` (multi-root directory lookups), `naming.rs` (username
//! derivation from profile folder names), `planner.rs` (profile records with
//! deterministic targets), `powershell.rs` (directory and translator adapters).

pub mod error;
pub mod naming;
pub mod planner;
pub mod powershell;
pub mod resolver;

pub use error::{IdentityError, IdentityResult};
pub use naming::{FolderName, parse_folder_name};
pub use planner::{DISPLAY_NAME_NOT_FOUND, MigrationPlanner, PlanOptions};
pub use powershell::{PowerShellDirectory, PowerShellTranslator};
pub use resolver::IdentityResolver;
