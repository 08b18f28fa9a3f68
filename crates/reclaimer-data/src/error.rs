//! Error types for the data access layer.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result alias for data layer operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by the data access layer.
#[derive(Debug)]
pub enum DataError {
    /// Establishing the connection pool failed.
    ConnectFailed {
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// A database operation failed.
    QueryFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// The queried instance row does not exist.
    NotFound {
        /// Operation identifier.
        operation: &'static str,
        /// Instance key that was looked up.
        instance_key: i64,
    },
    /// A column held a value outside the range the model accepts.
    OutOfRange {
        /// Column name.
        field: &'static str,
        /// Raw value read from the row.
        value: i64,
    },
}

impl DataError {
    pub(crate) const fn query(operation: &'static str, source: sqlx::Error) -> Self {
        Self::QueryFailed { operation, source }
    }
}

impl Display for DataError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed { .. } => formatter.write_str("database connection failed"),
            Self::QueryFailed { .. } => formatter.write_str("database operation failed"),
            Self::NotFound { .. } => formatter.write_str("instance record not found"),
            Self::OutOfRange { .. } => formatter.write_str("column value out of range"),
        }
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConnectFailed { source } | Self::QueryFailed { source, .. } => Some(source),
            Self::NotFound { .. } | Self::OutOfRange { .. } => None,
        }
    }
}
