//! Prometheus-backed counters for the poll/reclaim pipeline.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counters only grow; the in-flight gauge mirrors the poller's claim set.

use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Prometheus-backed metrics registry shared by the poller and workers.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    polls_total: IntCounter,
    poll_failures_total: IntCounter,
    keys_submitted_total: IntCounter,
    keys_skipped_total: IntCounter,
    records_reclaimed_total: IntCounter,
    lookup_failures_total: IntCounter,
    mark_failures_total: IntCounter,
    files_removed_total: IntCounter,
    files_absent_total: IntCounter,
    file_remove_failures_total: IntCounter,
    task_timeouts_total: IntCounter,
    in_flight: IntGauge,
}

/// Point-in-time copy of every counter, suitable for a shutdown summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Poll iterations started.
    pub polls_total: u64,
    /// Poll iterations whose pending query failed.
    pub poll_failures_total: u64,
    /// Keys handed to the worker pool.
    pub keys_submitted_total: u64,
    /// Keys skipped because they were still being processed.
    pub keys_skipped_total: u64,
    /// Records whose files were handled and whose flag update was issued.
    pub records_reclaimed_total: u64,
    /// Path lookups that failed and left the record untouched.
    pub lookup_failures_total: u64,
    /// Flag updates that failed.
    pub mark_failures_total: u64,
    /// Files deleted.
    pub files_removed_total: u64,
    /// Files already missing when deletion was attempted.
    pub files_absent_total: u64,
    /// Deletions that failed with an error other than not-found.
    pub file_remove_failures_total: u64,
    /// Tasks abandoned after exceeding their time budget.
    pub task_timeouts_total: u64,
    /// Keys currently claimed by the poller.
    pub in_flight: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the pipeline collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> Result<IntCounter> {
            let collector = IntCounter::with_opts(Opts::new(name, help))
                .with_context(|| format!("failed to build counter {name}"))?;
            registry
                .register(Box::new(collector.clone()))
                .with_context(|| format!("failed to register counter {name}"))?;
            Ok(collector)
        };

        let polls_total = counter("reclaimer_polls_total", "Poll iterations started")?;
        let poll_failures_total = counter(
            "reclaimer_poll_failures_total",
            "Poll iterations whose pending query failed",
        )?;
        let keys_submitted_total = counter(
            "reclaimer_keys_submitted_total",
            "Instance keys handed to the worker pool",
        )?;
        let keys_skipped_total = counter(
            "reclaimer_keys_skipped_total",
            "Instance keys skipped because they were still in flight",
        )?;
        let records_reclaimed_total = counter(
            "reclaimer_records_reclaimed_total",
            "Records whose files were handled and flag update issued",
        )?;
        let lookup_failures_total = counter(
            "reclaimer_lookup_failures_total",
            "File path lookups that failed",
        )?;
        let mark_failures_total = counter(
            "reclaimer_mark_failures_total",
            "Processed-flag updates that failed",
        )?;
        let files_removed_total =
            counter("reclaimer_files_removed_total", "Files deleted from disk")?;
        let files_absent_total = counter(
            "reclaimer_files_absent_total",
            "Files already absent when deletion was attempted",
        )?;
        let file_remove_failures_total = counter(
            "reclaimer_file_remove_failures_total",
            "File deletions that failed",
        )?;
        let task_timeouts_total = counter(
            "reclaimer_task_timeouts_total",
            "Tasks abandoned after exceeding their time budget",
        )?;

        let in_flight = IntGauge::with_opts(Opts::new(
            "reclaimer_in_flight",
            "Instance keys currently claimed by the poller",
        ))?;
        registry.register(Box::new(in_flight.clone()))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                polls_total,
                poll_failures_total,
                keys_submitted_total,
                keys_skipped_total,
                records_reclaimed_total,
                lookup_failures_total,
                mark_failures_total,
                files_removed_total,
                files_absent_total,
                file_remove_failures_total,
                task_timeouts_total,
                in_flight,
            }),
        })
    }

    /// Count a poll iteration.
    pub fn inc_poll(&self) {
        self.inner.polls_total.inc();
    }

    /// Count a failed pending query.
    pub fn inc_poll_failure(&self) {
        self.inner.poll_failures_total.inc();
    }

    /// Count a key handed to the pool.
    pub fn inc_key_submitted(&self) {
        self.inner.keys_submitted_total.inc();
    }

    /// Count a key skipped while still in flight.
    pub fn inc_key_skipped(&self) {
        self.inner.keys_skipped_total.inc();
    }

    /// Count a record whose flag update was issued.
    pub fn inc_record_reclaimed(&self) {
        self.inner.records_reclaimed_total.inc();
    }

    /// Count a failed path lookup.
    pub fn inc_lookup_failure(&self) {
        self.inner.lookup_failures_total.inc();
    }

    /// Count a failed flag update.
    pub fn inc_mark_failure(&self) {
        self.inner.mark_failures_total.inc();
    }

    /// Count a deleted file.
    pub fn inc_file_removed(&self) {
        self.inner.files_removed_total.inc();
    }

    /// Count a file that was already absent.
    pub fn inc_file_absent(&self) {
        self.inner.files_absent_total.inc();
    }

    /// Count a failed deletion.
    pub fn inc_file_remove_failure(&self) {
        self.inner.file_remove_failures_total.inc();
    }

    /// Count a task abandoned on timeout.
    pub fn inc_task_timeout(&self) {
        self.inner.task_timeouts_total.inc();
    }

    /// Record the size of the in-flight claim set.
    pub fn set_in_flight(&self, count: usize) {
        self.inner
            .in_flight
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = &self.inner;
        MetricsSnapshot {
            polls_total: inner.polls_total.get(),
            poll_failures_total: inner.poll_failures_total.get(),
            keys_submitted_total: inner.keys_submitted_total.get(),
            keys_skipped_total: inner.keys_skipped_total.get(),
            records_reclaimed_total: inner.records_reclaimed_total.get(),
            lookup_failures_total: inner.lookup_failures_total.get(),
            mark_failures_total: inner.mark_failures_total.get(),
            files_removed_total: inner.files_removed_total.get(),
            files_absent_total: inner.files_absent_total.get(),
            file_remove_failures_total: inner.file_remove_failures_total.get(),
            task_timeouts_total: inner.task_timeouts_total.get(),
            in_flight: inner.in_flight.get(),
        }
    }
}
