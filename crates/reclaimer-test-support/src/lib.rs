#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (docker probe, destination-root helpers), mocks.rs (fake gateway
//! and remover).

pub mod fixtures;
pub mod mocks;
