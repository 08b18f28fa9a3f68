//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug)]
pub enum TelemetryError {
    /// Installing the tracing subscriber failed.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// The log file path has no file name component.
    LogFileName {
        /// Path that was configured.
        path: PathBuf,
    },
    /// Opening the log file appender failed.
    LogFileOpen {
        /// Path that could not be opened.
        path: PathBuf,
        /// Underlying appender error.
        source: tracing_appender::rolling::InitError,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberInstall { .. } => {
                formatter.write_str("failed to install tracing subscriber")
            }
            Self::LogFileName { .. } => formatter.write_str("log file path has no file name"),
            Self::LogFileOpen { .. } => formatter.write_str("failed to open log file"),
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source } => Some(source),
            Self::LogFileName { .. } => None,
            Self::LogFileOpen { source, .. } => Some(source),
        }
    }
}
