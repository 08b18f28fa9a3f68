#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Telemetry primitives shared across the reclaimer workspace.
//!
//! Layout: `init.rs` (subscriber installation), `context.rs` (process span),
//! `metrics.rs` (pipeline counters), `error.rs` (error type).

pub mod context;
pub mod error;
pub mod init;
pub mod metrics;

pub use context::{GlobalContextGuard, instance_span};
pub use error::{Result as TelemetryResult, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, LoggingGuard, build_sha, init_logging};
pub use metrics::{Metrics, MetricsSnapshot};
