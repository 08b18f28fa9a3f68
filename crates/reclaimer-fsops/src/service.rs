//! Path resolution and idempotent deletion under a fixed destination root.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{FsOpsError, FsOpsResult};

/// Result of a single removal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The file existed and was deleted.
    Removed(PathBuf),
    /// Nothing existed at the resolved path.
    Absent(PathBuf),
}

impl RemoveOutcome {
    /// Absolute path the attempt targeted.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Removed(path) | Self::Absent(path) => path,
        }
    }
}

/// Deletes files named by stored relative paths.
#[async_trait]
pub trait FileRemoval: Send + Sync {
    /// Join `relative` onto the destination root.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::InvalidInput`] for paths that are empty or escape the root.
    fn resolve(&self, relative: &str) -> FsOpsResult<PathBuf>;

    /// Delete the file at `relative`; a missing file yields [`RemoveOutcome::Absent`].
    ///
    /// # Errors
    ///
    /// Returns an error when the path is rejected or deletion fails for a reason other
    /// than the file not existing.
    async fn remove(&self, relative: &str) -> FsOpsResult<RemoveOutcome>;
}

/// [`FileRemoval`] over the local filesystem.
#[derive(Debug, Clone)]
pub struct FileRemover {
    root: PathBuf,
}

impl FileRemover {
    /// Confine removals to `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Destination root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileRemoval for FileRemover {
    fn resolve(&self, relative: &str) -> FsOpsResult<PathBuf> {
        let trimmed = relative.trim_start_matches(['/', '\\']);
        if trimmed.is_empty() {
            return Err(FsOpsError::invalid_input(
                "relative_path",
                "must_not_be_empty",
                relative,
            ));
        }

        let mut resolved = self.root.clone();
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(FsOpsError::invalid_input(
                        "relative_path",
                        "parent_component",
                        relative,
                    ));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(FsOpsError::invalid_input(
                        "relative_path",
                        "absolute_component",
                        relative,
                    ));
                }
            }
        }
        Ok(resolved)
    }

    async fn remove(&self, relative: &str) -> FsOpsResult<RemoveOutcome> {
        let path = self.resolve(relative)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "file removed");
                Ok(RemoveOutcome::Removed(path))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "file already absent");
                Ok(RemoveOutcome::Absent(path))
            }
            Err(err) => Err(FsOpsError::io("remove_file", path, err)),
        }
    }
}
