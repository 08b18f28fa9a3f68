//! Per-record reclamation: look up paths, delete both files, mark the record done.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reclaimer_data::{InstanceKey, StorageGateway};
use reclaimer_fsops::{FileRemoval, RemoveOutcome};
use reclaimer_telemetry::{Metrics, instance_span};
use tracing::{Instrument, debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::in_flight::InFlightKeys;
use crate::pool::TaskHandler;

/// What happened to the files of a reclaimed record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReclaimReport {
    /// Files deleted.
    pub removed: Vec<PathBuf>,
    /// Files that were already gone.
    pub absent: Vec<PathBuf>,
    /// Stored relative paths whose deletion failed.
    pub failed: Vec<String>,
    /// Whether the flag update succeeded.
    pub marked: bool,
}

/// Result of one reclamation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum ReclaimOutcome {
    /// Path lookup failed; nothing was deleted or marked.
    LookupFailed,
    /// Both deletion attempts were issued and the flag update was attempted.
    Reclaimed(ReclaimReport),
}

/// Worker-side handler for one instance key.
pub struct Reclaimer {
    gateway: Arc<dyn StorageGateway>,
    remover: Arc<dyn FileRemoval>,
    metrics: Metrics,
    in_flight: InFlightKeys,
    operation_timeout: Duration,
}

impl Reclaimer {
    /// Build a handler; each gateway and filesystem call is bounded by `operation_timeout`.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn StorageGateway>,
        remover: Arc<dyn FileRemoval>,
        metrics: Metrics,
        in_flight: InFlightKeys,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            remover,
            metrics,
            in_flight,
            operation_timeout,
        }
    }

    /// Reclaim the files of `key` and mark it processed.
    ///
    /// Lookup failure ends the attempt without marking. Deletion failures are logged
    /// and do not prevent the flag update.
    pub async fn reclaim(&self, key: InstanceKey) -> ReclaimOutcome {
        self.reclaim_record(key)
            .instrument(instance_span(key.get()))
            .await
    }

    async fn reclaim_record(&self, key: InstanceKey) -> ReclaimOutcome {
        let paths = match self
            .bounded("fetch_paths", self.gateway.fetch_paths(key), |err| {
                AppError::data("fetch_paths", err)
            })
            .await
        {
            Ok(paths) => paths,
            Err(err) => {
                self.metrics.inc_lookup_failure();
                warn!(error = %err, "path lookup failed; record left for a later poll");
                return ReclaimOutcome::LookupFailed;
            }
        };

        let mut report = ReclaimReport::default();
        for (role, relative) in paths.iter() {
            let removal = self
                .bounded("remove_file", self.remover.remove(relative), |err| {
                    AppError::fsops("remove_file", err)
                })
                .await;
            match removal {
                Ok(RemoveOutcome::Removed(path)) => {
                    self.metrics.inc_file_removed();
                    debug!(role = role.as_str(), path = %path.display(), "file deleted");
                    report.removed.push(path);
                }
                Ok(RemoveOutcome::Absent(path)) => {
                    self.metrics.inc_file_absent();
                    debug!(role = role.as_str(), path = %path.display(), "file already absent");
                    report.absent.push(path);
                }
                Err(err) => {
                    self.metrics.inc_file_remove_failure();
                    warn!(
                        role = role.as_str(),
                        path = relative,
                        error = %err,
                        "file deletion failed"
                    );
                    report.failed.push(relative.to_string());
                }
            }
        }

        match self
            .bounded("mark_processed", self.gateway.mark_processed(key), |err| {
                AppError::data("mark_processed", err)
            })
            .await
        {
            Ok(()) => {
                report.marked = true;
                self.metrics.inc_record_reclaimed();
                info!(
                    removed = report.removed.len(),
                    absent = report.absent.len(),
                    failed = report.failed.len(),
                    "record reclaimed"
                );
            }
            Err(err) => {
                self.metrics.inc_mark_failure();
                warn!(error = %err, "flag update failed; record will be selected again");
            }
        }

        ReclaimOutcome::Reclaimed(report)
    }

    async fn bounded<T, E, F, M>(&self, operation: &'static str, step: F, map: M) -> AppResult<T>
    where
        F: Future<Output = Result<T, E>>,
        M: FnOnce(E) -> AppError,
    {
        match tokio::time::timeout(self.operation_timeout, step).await {
            Ok(result) => result.map_err(map),
            Err(_) => Err(AppError::timeout(operation, self.operation_timeout)),
        }
    }
}

#[async_trait]
impl TaskHandler<InstanceKey> for Reclaimer {
    async fn handle(&self, key: InstanceKey) {
        let _claim = self.in_flight.release_on_drop(key);
        let _outcome = self.reclaim(key).await;
    }

    fn on_timeout(&self, key: &InstanceKey) {
        self.metrics.inc_task_timeout();
        warn!(instance_key = key.get(), "reclaim task abandoned");
    }
}
