//! Row-level types read from the `instance` and `image` tables.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

/// Raw `FileExist` value marking a record as reclaimed.
const FLAG_DONE: i32 = 2;
/// Raw `FileExist` value written by the upstream ingest for live files.
const FLAG_PENDING: i32 = 1;

/// Primary key of an `instance` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceKey(pub i64);

impl InstanceKey {
    /// Raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for InstanceKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for InstanceKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Storage-location code used to partition `instance` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationCode(pub i32);

impl LocationCode {
    /// Raw integer value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for LocationCode {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl Display for LocationCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Decoded `instance.FileExist` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistenceFlag {
    /// Files are expected on disk.
    Pending,
    /// Files were reclaimed; the record is excluded from selection.
    Done,
    /// Any other value, including NULL (decoded as `0`).
    Other(i32),
}

impl ExistenceFlag {
    /// Decode a nullable column value.
    #[must_use]
    pub const fn from_raw(raw: Option<i32>) -> Self {
        match raw {
            Some(FLAG_PENDING) => Self::Pending,
            Some(FLAG_DONE) => Self::Done,
            Some(other) => Self::Other(other),
            None => Self::Other(0),
        }
    }

    /// Value as stored in the column.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Pending => FLAG_PENDING,
            Self::Done => FLAG_DONE,
            Self::Other(raw) => raw,
        }
    }

    /// Whether the pending query still selects records carrying this flag.
    #[must_use]
    pub const fn is_selectable(self) -> bool {
        !matches!(self, Self::Done)
    }
}

/// One row returned by the pending query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingRecord {
    /// Record identifier.
    pub key: InstanceKey,
    /// Location the record belongs to.
    pub location_code: LocationCode,
    /// Current marker value.
    pub flag: ExistenceFlag,
}

impl PendingRecord {
    /// Build a record from widened column values.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::OutOfRange`] when the location code or flag do not fit the
    /// model's integer width.
    pub fn from_columns(key: i64, location_code: i64, flag: Option<i64>) -> Result<Self> {
        let location_code = narrow("location_code", location_code)?;
        let flag = flag.map(|raw| narrow("FileExist", raw)).transpose()?;
        Ok(Self {
            key: InstanceKey(key),
            location_code: LocationCode(location_code),
            flag: ExistenceFlag::from_raw(flag),
        })
    }
}

fn narrow(field: &'static str, value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| DataError::OutOfRange { field, value })
}

/// Which of the two stored paths a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    /// `instance.file_name`.
    Primary,
    /// `image.img_file_name`.
    Secondary,
}

impl FileRole {
    /// Short label used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// Relative file paths stored for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilePaths {
    /// Path from `instance.file_name`.
    pub primary: Option<String>,
    /// Path from `image.img_file_name`.
    pub secondary: Option<String>,
}

impl FilePaths {
    /// Build from nullable column values; empty strings are treated as absent.
    #[must_use]
    pub fn from_columns(primary: Option<String>, secondary: Option<String>) -> Self {
        Self {
            primary: primary.filter(|value| !value.is_empty()),
            secondary: secondary.filter(|value| !value.is_empty()),
        }
    }

    /// True when neither path is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.primary.is_none() && self.secondary.is_none()
    }

    /// Present paths in deletion order: primary first, then secondary.
    pub fn iter(&self) -> impl Iterator<Item = (FileRole, &str)> {
        [
            (FileRole::Primary, self.primary.as_deref()),
            (FileRole::Secondary, self.secondary.as_deref()),
        ]
        .into_iter()
        .filter_map(|(role, path)| path.map(|path| (role, path)))
    }
}
