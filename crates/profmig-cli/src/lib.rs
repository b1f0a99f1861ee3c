#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
#![allow(clippy::redundant_pub_crate)]

//! Command-line entry point for running a profile migration batch.
//!
//! Layout:
//! - `cli.rs`: argument parsing, configuration overrides and the batch call
//! - `output.rs`: terminal summary and exit-code mapping
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod output;

pub use cli::run;
