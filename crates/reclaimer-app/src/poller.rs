//! Pending-record polling loop feeding the worker pool.

use std::sync::Arc;
use std::time::Duration;

use reclaimer_data::{DataError, InstanceKey, LocationCode, StorageGateway};
use reclaimer_telemetry::Metrics;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::in_flight::InFlightKeys;
use crate::pool::WorkerPool;

/// Knobs for the polling loop.
#[derive(Debug, Clone, Copy)]
pub struct PollerSettings {
    /// Location code filter for the pending query.
    pub location: LocationCode,
    /// Maximum number of records fetched per poll.
    pub batch_limit: u32,
    /// Sleep between polls that submitted nothing.
    pub idle_interval: Duration,
    /// Upper bound on a single pending query.
    pub query_timeout: Duration,
}

/// Counts observed by one poll iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// Records returned by the pending query.
    pub fetched: usize,
    /// Keys handed to the pool.
    pub submitted: usize,
    /// Keys skipped because an earlier submission is still running.
    pub skipped: usize,
}

/// Reasons a poll iteration ended early.
#[derive(Debug, Error)]
pub enum PollError {
    /// The pending query failed.
    #[error("pending query failed")]
    Fetch {
        /// Source data error.
        source: DataError,
    },
    /// The pending query exceeded its time budget.
    #[error("pending query timed out")]
    TimedOut {
        /// Budget that was exceeded.
        timeout: Duration,
    },
    /// Shutdown was requested mid-iteration.
    #[error("poll interrupted by shutdown")]
    Interrupted,
    /// The worker pool no longer accepts work.
    #[error("worker pool closed")]
    PoolClosed,
}

/// Single producer that selects pending records and submits their keys.
pub struct Poller {
    gateway: Arc<dyn StorageGateway>,
    pool: Arc<WorkerPool<InstanceKey>>,
    in_flight: InFlightKeys,
    metrics: Metrics,
    settings: PollerSettings,
}

impl Poller {
    /// Assemble a poller over shared collaborators.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn StorageGateway>,
        pool: Arc<WorkerPool<InstanceKey>>,
        in_flight: InFlightKeys,
        metrics: Metrics,
        settings: PollerSettings,
    ) -> Self {
        Self {
            gateway,
            pool,
            in_flight,
            metrics,
            settings,
        }
    }

    /// Run one fetch-and-submit iteration.
    ///
    /// Keys are submitted in query order; each submit waits for an idle worker.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Fetch`] or [`PollError::TimedOut`] when the query fails,
    /// [`PollError::Interrupted`] when `shutdown` fires, and [`PollError::PoolClosed`]
    /// when the pool stops accepting work.
    pub async fn poll_once(&self, shutdown: &CancellationToken) -> Result<PollOutcome, PollError> {
        self.metrics.inc_poll();
        let fetch = tokio::time::timeout(
            self.settings.query_timeout,
            self.gateway
                .fetch_pending(self.settings.location, self.settings.batch_limit),
        );
        let fetched = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Err(PollError::Interrupted),
            fetched = fetch => fetched,
        };
        let records = match fetched {
            Ok(Ok(records)) => records,
            Ok(Err(source)) => {
                self.metrics.inc_poll_failure();
                return Err(PollError::Fetch { source });
            }
            Err(_) => {
                self.metrics.inc_poll_failure();
                return Err(PollError::TimedOut {
                    timeout: self.settings.query_timeout,
                });
            }
        };

        let mut outcome = PollOutcome {
            fetched: records.len(),
            ..PollOutcome::default()
        };
        for record in records {
            let key = record.key;
            if !self.in_flight.try_claim(key) {
                outcome.skipped += 1;
                self.metrics.inc_key_skipped();
                debug!(instance_key = key.get(), "key still in flight; skipped");
                continue;
            }

            let submitted = tokio::select! {
                biased;
                () = shutdown.cancelled() => None,
                submitted = self.pool.submit(key) => Some(submitted),
            };
            match submitted {
                Some(Ok(())) => {
                    outcome.submitted += 1;
                    self.metrics.inc_key_submitted();
                }
                Some(Err(_)) => {
                    self.in_flight.release(key);
                    return Err(PollError::PoolClosed);
                }
                None => {
                    self.in_flight.release(key);
                    return Err(PollError::Interrupted);
                }
            }
        }
        Ok(outcome)
    }

    /// Poll until `shutdown` is cancelled. Query failures are logged and retried.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            location_code = self.settings.location.get(),
            batch_limit = self.settings.batch_limit,
            "poller started"
        );
        while !shutdown.is_cancelled() {
            let submitted = match self.poll_once(&shutdown).await {
                Ok(outcome) => {
                    debug!(
                        fetched = outcome.fetched,
                        submitted = outcome.submitted,
                        skipped = outcome.skipped,
                        "poll complete"
                    );
                    outcome.submitted
                }
                Err(PollError::Interrupted) => break,
                Err(PollError::PoolClosed) => {
                    warn!("worker pool closed; poller stopping");
                    break;
                }
                Err(err) => {
                    error!(error = %err, "pending query failed; retrying on next poll");
                    0
                }
            };

            if submitted == 0 {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(self.settings.idle_interval) => {}
                }
            }
        }
        info!("poller stopped");
    }
}
