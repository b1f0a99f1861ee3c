#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Telemetry primitives shared across the profmig workspace.
//!
//! This crate centralises logging, metrics and span helpers so every component
//! reports through one configured subscriber.

pub mod context;
pub mod init;
pub mod metrics;

pub use context::{GlobalContextGuard, profile_span};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, LoggingGuard, build_sha, init_logging};
pub use metrics::{Metrics, MetricsSnapshot};
