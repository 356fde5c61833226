//! Injectable state tables
//!
//! Local status, pending confirmations and dispense locks each sit behind a
//! small trait so a file- or remote-backed table can replace the in-memory
//! one without touching the reconciler.

use atlas_codec::EventType;
use dashmap::DashMap;
use std::fmt::Debug;

use crate::types::{DispenseLock, PendingConfirmation};

/// Local (optimistic) status per topic
pub trait StatusStore: Send + Sync + Debug {
    /// Current local status
    fn get(&self, topic_id: &str) -> Option<EventType>;

    /// Overwrite local status
    fn set(&self, topic_id: &str, status: EventType);

    /// Forget a topic; true when something was removed
    fn delete(&self, topic_id: &str) -> bool;

    /// Number of topics with a local status
    fn len(&self) -> usize;

    /// No local statuses
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pending confirmation records
pub trait ConfirmationStore: Send + Sync + Debug {
    /// Record for a topic
    fn get(&self, topic_id: &str) -> Option<PendingConfirmation>;

    /// Insert or replace
    fn set(&self, record: PendingConfirmation);

    /// Remove; true when something was removed
    fn delete(&self, topic_id: &str) -> bool;

    /// All records
    fn list(&self) -> Vec<PendingConfirmation>;

    /// Number of records
    fn len(&self) -> usize {
        self.list().len()
    }

    /// No records tracked
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dispense lock table
pub trait LockStore: Send + Sync + Debug {
    /// Lock on a topic
    fn get(&self, topic_id: &str) -> Option<DispenseLock>;

    /// Insert or replace
    fn set(&self, lock: DispenseLock);

    /// Remove; true when something was removed
    fn delete(&self, topic_id: &str) -> bool;

    /// All locks
    fn list(&self) -> Vec<DispenseLock>;
}

/// In-memory status table
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    statuses: DashMap<String, EventType>,
}

impl MemoryStatusStore {
    /// Create empty table
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusStore for MemoryStatusStore {
    fn get(&self, topic_id: &str) -> Option<EventType> {
        self.statuses.get(topic_id).map(|s| *s)
    }

    fn set(&self, topic_id: &str, status: EventType) {
        self.statuses.insert(topic_id.to_string(), status);
    }

    fn delete(&self, topic_id: &str) -> bool {
        self.statuses.remove(topic_id).is_some()
    }

    fn len(&self) -> usize {
        self.statuses.len()
    }
}

/// In-memory confirmation table
#[derive(Debug, Default)]
pub struct MemoryConfirmationStore {
    records: DashMap<String, PendingConfirmation>,
}

impl MemoryConfirmationStore {
    /// Create empty table
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfirmationStore for MemoryConfirmationStore {
    fn get(&self, topic_id: &str) -> Option<PendingConfirmation> {
        self.records.get(topic_id).map(|r| r.clone())
    }

    fn set(&self, record: PendingConfirmation) {
        self.records.insert(record.topic_id.clone(), record);
    }

    fn delete(&self, topic_id: &str) -> bool {
        self.records.remove(topic_id).is_some()
    }

    fn list(&self) -> Vec<PendingConfirmation> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// In-memory lock table
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    locks: DashMap<String, DispenseLock>,
}

impl MemoryLockStore {
    /// Create empty table
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockStore for MemoryLockStore {
    fn get(&self, topic_id: &str) -> Option<DispenseLock> {
        self.locks.get(topic_id).map(|l| l.clone())
    }

    fn set(&self, lock: DispenseLock) {
        self.locks.insert(lock.topic_id.clone(), lock);
    }

    fn delete(&self, topic_id: &str) -> bool {
        self.locks.remove(topic_id).is_some()
    }

    fn list(&self) -> Vec<DispenseLock> {
        self.locks.iter().map(|l| l.value().clone()).collect()
    }
}
