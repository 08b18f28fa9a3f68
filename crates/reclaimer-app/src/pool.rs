//! Fixed-size worker pool with readiness-inbox dispatch.
//!
//! # Design
//! - Each worker owns a capacity-1 inbox and parks a sender for it on a shared ready
//!   queue whenever it is idle.
//! - `submit` pops the next ready inbox and forwards the task, so a caller blocks
//!   exactly while every worker is busy.
//! - Task bodies run in their own tokio task so a timeout can abort them and a panic
//!   does not take the worker down.
//! - A worker waits for an aborted task to unwind before it registers as idle again.
//!   Blocking filesystem calls already handed to the blocking pool still run to
//!   completion, so a timed-out deletion may finish after the worker moved on.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

/// Result alias for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors returned by [`WorkerPool`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was shut down or every worker has exited.
    #[error("worker pool closed")]
    Closed,
    /// A pool needs at least one worker.
    #[error("worker pool requires at least one worker")]
    EmptyPool,
}

/// Work executed by pool workers.
#[async_trait]
pub trait TaskHandler<T: Send + 'static>: Send + Sync {
    /// Process one task to completion.
    async fn handle(&self, task: T);

    /// Called after `task` was abandoned for exceeding the pool's task timeout.
    fn on_timeout(&self, _task: &T) {}
}

/// Fixed set of long-lived workers fed one task at a time.
pub struct WorkerPool<T> {
    ready: Mutex<mpsc::Receiver<mpsc::Sender<T>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stop: CancellationToken,
    size: usize,
}

impl<T> WorkerPool<T>
where
    T: Clone + Display + Send + 'static,
{
    /// Spawn `size` workers that run `handler`, each task bounded by `task_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::EmptyPool`] when `size` is zero.
    pub fn start(
        size: usize,
        handler: Arc<dyn TaskHandler<T>>,
        task_timeout: Duration,
    ) -> PoolResult<Self> {
        if size == 0 {
            return Err(PoolError::EmptyPool);
        }

        let (ready_tx, ready_rx) = mpsc::channel(size);
        let stop = CancellationToken::new();
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let worker = Worker {
                id,
                ready: ready_tx.clone(),
                handler: Arc::clone(&handler),
                task_timeout,
                stop: stop.clone(),
            };
            workers.push(tokio::spawn(
                worker.run().instrument(info_span!("worker", worker = id)),
            ));
        }

        Ok(Self {
            ready: Mutex::new(ready_rx),
            workers: Mutex::new(workers),
            stop,
            size,
        })
    }

    /// Number of workers the pool was started with.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Hand `task` to the next idle worker, waiting while all workers are busy.
    ///
    /// Cancel-safe: dropping the future before it resolves never loses a dispatched task.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] after [`WorkerPool::shutdown`] or once every worker
    /// has exited.
    pub async fn submit(&self, task: T) -> PoolResult<()> {
        let mut ready = self.ready.lock().await;
        let mut task = task;
        loop {
            let inbox = tokio::select! {
                biased;
                () = self.stop.cancelled() => return Err(PoolError::Closed),
                inbox = ready.recv() => inbox.ok_or(PoolError::Closed)?,
            };
            match inbox.try_send(task) {
                Ok(()) => return Ok(()),
                Err(
                    mpsc::error::TrySendError::Full(returned)
                    | mpsc::error::TrySendError::Closed(returned),
                ) => task = returned,
            }
        }
    }

    /// Stop accepting work, let workers finish what they hold, and join them.
    pub async fn shutdown(&self) {
        self.stop.cancel();
        let workers = std::mem::take(&mut *self.workers.lock().await);
        for worker in workers {
            if let Err(err) = worker.await {
                warn!(error = %err, "worker task join failed");
            }
        }
        debug!(workers = self.size, "worker pool stopped");
    }
}

struct Worker<T: Send + 'static> {
    id: usize,
    ready: mpsc::Sender<mpsc::Sender<T>>,
    handler: Arc<dyn TaskHandler<T>>,
    task_timeout: Duration,
    stop: CancellationToken,
}

impl<T> Worker<T>
where
    T: Clone + Display + Send + 'static,
{
    async fn run(self) {
        let (inbox_tx, mut inbox) = mpsc::channel::<T>(1);
        loop {
            tokio::select! {
                biased;
                () = self.stop.cancelled() => break,
                registered = self.ready.send(inbox_tx.clone()) => {
                    if registered.is_err() {
                        break;
                    }
                }
            }

            let next = tokio::select! {
                biased;
                task = inbox.recv() => task,
                () = self.stop.cancelled() => None,
            };
            let Some(task) = next else {
                break;
            };
            self.execute(task).await;
        }

        inbox.close();
        while let Ok(task) = inbox.try_recv() {
            self.execute(task).await;
        }
        debug!(worker = self.id, "worker exiting");
    }

    async fn execute(&self, task: T) {
        let label = task.clone();
        let handler = Arc::clone(&self.handler);
        let mut running = tokio::spawn(
            async move { handler.handle(task).await }.instrument(tracing::Span::current()),
        );

        let finished = tokio::time::timeout(self.task_timeout, &mut running).await;
        match finished {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(task = %label, error = %err, "task failed to complete");
            }
            Err(_) => {
                running.abort();
                if let Err(err) = running.await
                    && !err.is_cancelled()
                {
                    warn!(task = %label, error = %err, "abandoned task failed while unwinding");
                }
                warn!(
                    task = %label,
                    timeout_ms = u64::try_from(self.task_timeout.as_millis()).unwrap_or(u64::MAX),
                    "task exceeded its time budget and was abandoned"
                );
                self.handler.on_timeout(&label);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Context, Result};
    use tokio::sync::Semaphore;

    #[derive(Default)]
    struct CountingHandler {
        running: AtomicUsize,
        peak: AtomicUsize,
        seen: StdMutex<HashMap<u32, usize>>,
        delay: Duration,
    }

    #[async_trait]
    impl TaskHandler<u32> for CountingHandler {
        async fn handle(&self, task: u32) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            *self
                .seen
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .entry(task)
                .or_insert(0) += 1;
            self.running.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct GatedHandler {
        gate: Arc<Semaphore>,
        started: AtomicUsize,
        timeouts: AtomicUsize,
    }

    #[async_trait]
    impl TaskHandler<u32> for GatedHandler {
        async fn handle(&self, _task: u32) {
            self.started.fetch_add(1, Ordering::SeqCst);
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }

        fn on_timeout(&self, _task: &u32) {
            self.timeouts.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn gated() -> (Arc<GatedHandler>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let handler = Arc::new(GatedHandler {
            gate: Arc::clone(&gate),
            started: AtomicUsize::new(0),
            timeouts: AtomicUsize::new(0),
        });
        (handler, gate)
    }

    struct LiveGuard<'a>(&'a AtomicUsize);

    impl Drop for LiveGuard<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct StallingHandler {
        live: AtomicUsize,
        observed: StdMutex<Vec<usize>>,
    }

    #[async_trait]
    impl TaskHandler<u32> for StallingHandler {
        async fn handle(&self, task: u32) {
            let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.observed
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(now);
            let _live = LiveGuard(&self.live);
            if task == 1 {
                std::future::pending::<()>().await;
            }
        }
    }

    #[test]
    fn start_rejects_empty_pool() {
        let handler: Arc<dyn TaskHandler<u32>> = Arc::new(CountingHandler::default());
        let result = WorkerPool::<u32>::start(0, handler, Duration::from_secs(1));
        assert!(matches!(result, Err(PoolError::EmptyPool)));
    }

    #[tokio::test]
    async fn dispatches_each_task_exactly_once_within_bound() -> Result<()> {
        let handler = Arc::new(CountingHandler {
            delay: Duration::from_millis(10),
            ..CountingHandler::default()
        });
        let pool = WorkerPool::<u32>::start(3, handler.clone(), Duration::from_secs(5))?;
        assert_eq!(pool.size(), 3);

        for task in 0..20 {
            pool.submit(task).await?;
        }
        pool.shutdown().await;

        let seen = handler
            .seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        assert_eq!(seen.len(), 20);
        assert!(seen.values().all(|count| *count == 1));
        assert!(handler.peak.load(Ordering::SeqCst) <= 3);
        Ok(())
    }

    #[tokio::test]
    async fn submit_blocks_only_while_every_worker_is_busy() -> Result<()> {
        let (handler, gate) = gated();
        let pool = WorkerPool::<u32>::start(2, handler.clone(), Duration::from_secs(30))?;

        pool.submit(1).await?;
        pool.submit(2).await?;
        let blocked = tokio::time::timeout(Duration::from_millis(100), pool.submit(3)).await;
        assert!(blocked.is_err(), "third submit should wait for a free worker");

        gate.add_permits(1);
        tokio::time::timeout(Duration::from_secs(5), pool.submit(3))
            .await
            .context("submit should proceed once a worker frees up")??;

        gate.add_permits(2);
        pool.shutdown().await;
        assert_eq!(handler.started.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn timed_out_tasks_are_abandoned_and_worker_recovers() -> Result<()> {
        let (handler, gate) = gated();
        let pool = WorkerPool::<u32>::start(1, handler.clone(), Duration::from_millis(200))?;

        pool.submit(1).await?;
        tokio::time::timeout(Duration::from_secs(5), pool.submit(2))
            .await
            .context("worker should become ready after the timeout")??;
        gate.add_permits(1);
        pool.shutdown().await;

        assert_eq!(handler.timeouts.load(Ordering::SeqCst), 1);
        assert_eq!(handler.started.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn abandoned_task_unwinds_before_next_task_starts() -> Result<()> {
        let handler = Arc::new(StallingHandler::default());
        let pool = WorkerPool::<u32>::start(1, handler.clone(), Duration::from_millis(100))?;

        pool.submit(1).await?;
        tokio::time::timeout(Duration::from_secs(5), pool.submit(2))
            .await
            .context("worker should accept work after abandoning the stalled task")??;
        pool.shutdown().await;

        let observed = handler
            .observed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        assert_eq!(observed, vec![1, 1]);
        assert_eq!(handler.live.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_drains_in_flight_work_and_closes_submit() -> Result<()> {
        let handler = Arc::new(CountingHandler {
            delay: Duration::from_millis(50),
            ..CountingHandler::default()
        });
        let pool = WorkerPool::<u32>::start(2, handler.clone(), Duration::from_secs(5))?;
        pool.submit(1).await?;
        pool.submit(2).await?;
        pool.shutdown().await;

        assert_eq!(
            handler
                .seen
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .len(),
            2
        );
        assert_eq!(pool.submit(3).await, Err(PoolError::Closed));
        Ok(())
    }
}
