//! # Design
//!
//! - Centralize application-level errors for bootstrap and shutdown.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Errors raised while processing individual records are logged by the worker and
//!   never surface here.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::pool::PoolError;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: reclaimer_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: reclaimer_telemetry::TelemetryError,
    },
    /// Metrics registry construction failed.
    #[error("metrics operation failed")]
    Metrics {
        /// Operation identifier.
        operation: &'static str,
        /// Source registry error.
        source: Box<dyn StdError + Send + Sync>,
    },
    /// Storage gateway operations failed.
    #[error("storage operation failed")]
    Data {
        /// Operation identifier.
        operation: &'static str,
        /// Source data error.
        source: reclaimer_data::DataError,
    },
    /// File removal operations failed.
    #[error("file removal failed")]
    FsOps {
        /// Operation identifier.
        operation: &'static str,
        /// Source fsops error.
        source: reclaimer_fsops::FsOpsError,
    },
    /// Worker pool operations failed.
    #[error("worker pool operation failed")]
    Pool {
        /// Operation identifier.
        operation: &'static str,
        /// Source pool error.
        source: PoolError,
    },
    /// A bounded operation exceeded its time budget.
    #[error("operation timed out")]
    Timeout {
        /// Operation identifier.
        operation: &'static str,
        /// Budget that was exceeded.
        timeout: Duration,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: reclaimer_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: reclaimer_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) fn metrics(
        operation: &'static str,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Metrics {
            operation,
            source: source.into(),
        }
    }

    pub(crate) const fn data(operation: &'static str, source: reclaimer_data::DataError) -> Self {
        Self::Data { operation, source }
    }

    pub(crate) const fn fsops(
        operation: &'static str,
        source: reclaimer_fsops::FsOpsError,
    ) -> Self {
        Self::FsOps { operation, source }
    }

    pub(crate) const fn pool(operation: &'static str, source: PoolError) -> Self {
        Self::Pool { operation, source }
    }

    pub(crate) const fn timeout(operation: &'static str, timeout: Duration) -> Self {
        Self::Timeout { operation, timeout }
    }
}
