#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Reclaimer application wiring.
//!
//! Layout: `bootstrap.rs` (startup and shutdown), `poller.rs` (pending-record loop),
//! `pool.rs` (fixed worker pool), `reclaim.rs` (per-record task), `in_flight.rs`
//! (claim set shared by the poller and workers).

/// Startup, signal handling and orderly shutdown.
pub mod bootstrap;
/// Application error type.
pub mod error;
/// Keys submitted but not yet finished.
pub mod in_flight;
/// Pending-record polling loop.
pub mod poller;
/// Fixed-size worker pool with readiness dispatch.
pub mod pool;
/// Per-record reclamation task.
pub mod reclaim;

pub use bootstrap::{BootstrapDependencies, run_app, run_with};
pub use error::{AppError, AppResult};
pub use in_flight::{ClaimGuard, InFlightKeys};
pub use poller::{PollError, PollOutcome, Poller, PollerSettings};
pub use pool::{PoolError, PoolResult, TaskHandler, WorkerPool};
pub use reclaim::{ReclaimOutcome, ReclaimReport, Reclaimer};
