//! Claim set of keys that were submitted but have not finished processing.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use reclaimer_data::InstanceKey;
use reclaimer_telemetry::Metrics;
use tracing::error;

/// Keys claimed by the poller, released when their worker task ends.
#[derive(Clone)]
pub struct InFlightKeys {
    keys: Arc<Mutex<HashSet<InstanceKey>>>,
    metrics: Metrics,
}

impl InFlightKeys {
    /// Empty claim set reporting its size to `metrics`.
    #[must_use]
    pub fn new(metrics: Metrics) -> Self {
        Self {
            keys: Arc::new(Mutex::new(HashSet::new())),
            metrics,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<InstanceKey>> {
        match self.keys.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("in-flight mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }

    /// Claim `key`; returns `false` when it is already claimed.
    pub fn try_claim(&self, key: InstanceKey) -> bool {
        let mut keys = self.lock();
        let claimed = keys.insert(key);
        self.metrics.set_in_flight(keys.len());
        claimed
    }

    /// Release `key`. Releasing an unclaimed key is a no-op.
    pub fn release(&self, key: InstanceKey) {
        let mut keys = self.lock();
        keys.remove(&key);
        self.metrics.set_in_flight(keys.len());
    }

    /// Guard that releases `key` when dropped, including when its task is aborted.
    #[must_use]
    pub fn release_on_drop(&self, key: InstanceKey) -> ClaimGuard {
        ClaimGuard {
            keys: self.clone(),
            key,
        }
    }

    /// Whether `key` is currently claimed.
    #[must_use]
    pub fn contains(&self, key: InstanceKey) -> bool {
        self.lock().contains(&key)
    }

    /// Number of claimed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Releases its key on drop.
pub struct ClaimGuard {
    keys: InFlightKeys,
    key: InstanceKey,
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.keys.release(self.key);
    }
}
