//! Dispense locks
//!
//! At most one dispense may be in flight per prescription. A lock older than
//! the timeout is treated as abandoned and can be taken over.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ReconcileConfig;
use crate::store::{LockStore, MemoryLockStore};
use crate::types::{new_holder_id, DispenseLock};

/// Dispense lock manager
#[derive(Debug)]
pub struct DispenseLocks {
    store: Arc<dyn LockStore>,
    clock: Arc<dyn Clock>,
    timeout: chrono::Duration,
    guard: Mutex<()>,
}

impl DispenseLocks {
    /// Create lock manager
    pub fn new(store: Arc<dyn LockStore>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        let timeout = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
        Self {
            store,
            clock,
            timeout,
            guard: Mutex::new(()),
        }
    }

    /// In-memory table on the system clock
    pub fn in_memory(config: &ReconcileConfig) -> Self {
        Self::new(
            Arc::new(MemoryLockStore::new()),
            Arc::new(SystemClock),
            config.lock_timeout(),
        )
    }

    /// Try to take the lock for `topic_id`
    ///
    /// Granted when no lock exists or the existing one has expired. A fresh
    /// lock is never granted again, even to its own holder.
    pub fn acquire(&self, topic_id: &str, holder_id: &str) -> bool {
        let _guard = self.guard.lock();
        let now = self.clock.now();

        if let Some(existing) = self.store.get(topic_id) {
            if !self.expired(&existing, now) {
                debug!(
                    "Dispense lock on {} denied to {}: held by {}",
                    topic_id, holder_id, existing.holder_id
                );
                return false;
            }
            warn!(
                "Reclaiming abandoned dispense lock on {} from {}",
                topic_id, existing.holder_id
            );
        }

        self.store.set(DispenseLock {
            topic_id: topic_id.to_string(),
            holder_id: holder_id.to_string(),
            acquired_at: now,
        });
        info!("Dispense lock on {} granted to {}", topic_id, holder_id);
        true
    }

    /// Take the lock under a freshly generated holder id
    ///
    /// Returns the new holder id when granted.
    pub fn acquire_new(&self, topic_id: &str) -> Option<String> {
        let holder_id = new_holder_id();
        self.acquire(topic_id, &holder_id).then_some(holder_id)
    }

    /// Remove every expired lock, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let _guard = self.guard.lock();
        let now = self.clock.now();

        let purged = self
            .store
            .list()
            .into_iter()
            .filter(|lock| self.expired(lock, now))
            .filter(|lock| self.store.delete(&lock.topic_id))
            .count();
        if purged > 0 {
            debug!("Purged {} expired dispense locks", purged);
        }
        purged
    }

    /// Drop the lock; releasing an absent lock is a no-op
    pub fn release(&self, topic_id: &str) {
        let _guard = self.guard.lock();
        if self.store.delete(topic_id) {
            debug!("Dispense lock on {} released", topic_id);
        }
    }

    /// Whether a live lock exists; an expired one is removed
    pub fn is_locked(&self, topic_id: &str) -> bool {
        self.holder(topic_id).is_some()
    }

    /// Current live holder
    pub fn holder(&self, topic_id: &str) -> Option<String> {
        let _guard = self.guard.lock();
        let existing = self.store.get(topic_id)?;

        if self.expired(&existing, self.clock.now()) {
            self.store.delete(topic_id);
            debug!("Expired dispense lock on {} removed", topic_id);
            return None;
        }
        Some(existing.holder_id)
    }

    fn expired(&self, lock: &DispenseLock, now: DateTime<Utc>) -> bool {
        now - lock.acquired_at > self.timeout
    }
}
