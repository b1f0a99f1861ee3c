#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Typed configuration for a migration batch.
//!
//! Layout: `model.rs` (explicit settings structs), `defaults.rs` (denylists,
//! registry subtrees, retry policy), `validate.rs` (size parsing and field
//! validation), `loader.rs` (JSON file loading).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_file;
pub use model::{
    DiskSettings, IdentitySettings, LoggingSettings, MigrationConfig, NormalizeSettings,
    OutputSettings, TransferSettings,
};
pub use validate::{format_size, parse_size};
