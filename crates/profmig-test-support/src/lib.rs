#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::missing_panics_doc, clippy::must_use_candidate)]

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (identities and profile trees), mocks.rs (in-memory collaborators).

pub mod fixtures;
pub mod mocks;
