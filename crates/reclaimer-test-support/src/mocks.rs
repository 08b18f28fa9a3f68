//! In-memory doubles for the storage gateway and file remover.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reclaimer_data::{
    DataError, DataResult, ExistenceFlag, FilePaths, InstanceKey, LocationCode, PendingRecord,
    StorageGateway,
};
use reclaimer_fsops::{FileRemoval, FileRemover, FsOpsError, FsOpsResult, RemoveOutcome};
use tokio::sync::Semaphore;

/// Gateway call recorded by [`InMemoryGateway`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayCall {
    /// `fetch_pending(location, limit)`.
    FetchPending {
        /// Location filter.
        location: LocationCode,
        /// Batch limit.
        limit: u32,
    },
    /// `fetch_paths(key)`.
    FetchPaths(InstanceKey),
    /// `mark_processed(key)`.
    MarkProcessed(InstanceKey),
    /// `ping()`.
    Ping,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    location: LocationCode,
    flag: ExistenceFlag,
    paths: FilePaths,
}

#[derive(Default)]
struct GatewayState {
    records: BTreeMap<InstanceKey, StoredRecord>,
    fetch_failures: usize,
    ping_fails: bool,
    path_failures: HashSet<InstanceKey>,
    mark_failures: HashSet<InstanceKey>,
    path_delay: Option<Duration>,
    calls: Vec<GatewayCall>,
    marked: Vec<InstanceKey>,
}

/// Scriptable [`StorageGateway`] over a sorted in-memory table.
#[derive(Default)]
pub struct InMemoryGateway {
    state: Mutex<GatewayState>,
}

impl InMemoryGateway {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a record.
    pub fn insert(
        &self,
        key: i64,
        location: i32,
        flag: ExistenceFlag,
        primary: Option<&str>,
        secondary: Option<&str>,
    ) {
        self.state().records.insert(
            InstanceKey(key),
            StoredRecord {
                location: LocationCode(location),
                flag,
                paths: FilePaths::from_columns(
                    primary.map(str::to_string),
                    secondary.map(str::to_string),
                ),
            },
        );
    }

    /// Insert a pending record with the given paths.
    #[must_use]
    pub fn with_pending(
        self,
        key: i64,
        location: i32,
        primary: Option<&str>,
        secondary: Option<&str>,
    ) -> Self {
        self.insert(key, location, ExistenceFlag::Pending, primary, secondary);
        self
    }

    /// Make the next `count` pending queries fail.
    pub fn fail_next_fetches(&self, count: usize) {
        self.state().fetch_failures = count;
    }

    /// Make `ping` fail.
    pub fn fail_ping(&self) {
        self.state().ping_fails = true;
    }

    /// Make path lookups for `key` fail.
    pub fn fail_paths_for(&self, key: i64) {
        self.state().path_failures.insert(InstanceKey(key));
    }

    /// Make flag updates for `key` fail.
    pub fn fail_mark_for(&self, key: i64) {
        self.state().mark_failures.insert(InstanceKey(key));
    }

    /// Delay every path lookup.
    pub fn set_path_delay(&self, delay: Duration) {
        self.state().path_delay = Some(delay);
    }

    /// Flag value currently stored for `key`.
    #[must_use]
    pub fn flag(&self, key: i64) -> Option<ExistenceFlag> {
        self.state()
            .records
            .get(&InstanceKey(key))
            .map(|record| record.flag)
    }

    /// Every call observed so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().calls.clone()
    }

    /// Keys whose flag update succeeded, in completion order.
    #[must_use]
    pub fn marked(&self) -> Vec<InstanceKey> {
        self.state().marked.clone()
    }

    /// How many times `fetch_paths` was called per key.
    #[must_use]
    pub fn lookups_per_key(&self) -> HashMap<InstanceKey, usize> {
        let mut counts = HashMap::new();
        for call in &self.state().calls {
            if let GatewayCall::FetchPaths(key) = call {
                *counts.entry(*key).or_insert(0) += 1;
            }
        }
        counts
    }
}

fn scripted_failure(operation: &'static str) -> DataError {
    DataError::QueryFailed {
        operation,
        source: sqlx::Error::PoolTimedOut,
    }
}

#[async_trait]
impl StorageGateway for InMemoryGateway {
    async fn fetch_pending(
        &self,
        location: LocationCode,
        limit: u32,
    ) -> DataResult<Vec<PendingRecord>> {
        let mut state = self.state();
        state.calls.push(GatewayCall::FetchPending { location, limit });
        if state.fetch_failures > 0 {
            state.fetch_failures -= 1;
            return Err(scripted_failure("fetch_pending"));
        }
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(state
            .records
            .iter()
            .filter(|(_, record)| record.location == location && record.flag.is_selectable())
            .take(limit)
            .map(|(key, record)| PendingRecord {
                key: *key,
                location_code: record.location,
                flag: record.flag,
            })
            .collect())
    }

    async fn fetch_paths(&self, key: InstanceKey) -> DataResult<FilePaths> {
        let delay = {
            let mut state = self.state();
            state.calls.push(GatewayCall::FetchPaths(key));
            state.path_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if state.path_failures.contains(&key) {
            return Err(scripted_failure("fetch_paths"));
        }
        state
            .records
            .get(&key)
            .map(|record| record.paths.clone())
            .ok_or(DataError::NotFound {
                operation: "fetch_paths",
                instance_key: key.get(),
            })
    }

    async fn mark_processed(&self, key: InstanceKey) -> DataResult<()> {
        let mut state = self.state();
        state.calls.push(GatewayCall::MarkProcessed(key));
        if state.mark_failures.contains(&key) {
            return Err(scripted_failure("mark_processed"));
        }
        if let Some(record) = state.records.get_mut(&key) {
            record.flag = ExistenceFlag::Done;
        }
        state.marked.push(key);
        Ok(())
    }

    async fn ping(&self) -> DataResult<()> {
        let mut state = self.state();
        state.calls.push(GatewayCall::Ping);
        if state.ping_fails {
            return Err(scripted_failure("ping"));
        }
        Ok(())
    }
}

/// Removal attempt recorded by [`RecordingRemover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalAttempt {
    /// Relative path exactly as stored.
    pub relative: String,
    /// Outcome or failure description.
    pub result: RemovalResult,
}

/// Summary of a recorded removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalResult {
    /// File deleted at the path.
    Removed(PathBuf),
    /// Nothing existed at the path.
    Absent(PathBuf),
    /// The attempt failed.
    Failed,
}

/// [`FileRemoval`] that delegates to a real [`FileRemover`] and records every attempt.
pub struct RecordingRemover {
    inner: FileRemover,
    denied: Mutex<HashSet<String>>,
    attempts: Mutex<Vec<RemovalAttempt>>,
    gate: Option<Arc<Semaphore>>,
}

impl RecordingRemover {
    /// Record removals under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: FileRemover::new(root),
            denied: Mutex::new(HashSet::new()),
            attempts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Block each removal until a permit is added to the returned semaphore.
    #[must_use]
    pub fn gated(root: impl Into<PathBuf>) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut remover = Self::new(root);
        remover.gate = Some(Arc::clone(&gate));
        (remover, gate)
    }

    /// Fail removals of `relative` with a permission error.
    pub fn deny(&self, relative: &str) {
        self.denied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(relative.to_string());
    }

    /// Every attempt observed so far.
    #[must_use]
    pub fn attempts(&self) -> Vec<RemovalAttempt> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, relative: &str, result: RemovalResult) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RemovalAttempt {
                relative: relative.to_string(),
                result,
            });
    }
}

#[async_trait]
impl FileRemoval for RecordingRemover {
    fn resolve(&self, relative: &str) -> FsOpsResult<PathBuf> {
        self.inner.resolve(relative)
    }

    async fn remove(&self, relative: &str) -> FsOpsResult<RemoveOutcome> {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let denied = self
            .denied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(relative);
        let result = if denied {
            let path = self.inner.resolve(relative)?;
            Err(FsOpsError::Io {
                operation: "remove_file",
                path,
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            })
        } else {
            self.inner.remove(relative).await
        };

        let recorded = match &result {
            Ok(RemoveOutcome::Removed(path)) => RemovalResult::Removed(path.clone()),
            Ok(RemoveOutcome::Absent(path)) => RemovalResult::Absent(path.clone()),
            Err(_) => RemovalResult::Failed,
        };
        self.record(relative, recorded);
        result
    }
}
