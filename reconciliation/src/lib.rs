//! Status reconciliation for ledger-anchored prescriptions
//!
//! Provides:
//! - Optimistic local status with confirmation against the ledger read path
//! - Retry with a fixed escalating backoff schedule
//! - Mutual exclusion for the irreversible dispense transition
//! - A periodic sweep that heals local state from the ledger

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod clock;
pub mod config;
pub mod error;
pub mod locks;
pub mod machine;
pub mod reconciler;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ReconcileConfig;
pub use error::{Error, Result};
pub use locks::DispenseLocks;
pub use machine::{Observation, RetryPolicy, Transition};
pub use reconciler::{LedgerStatusSource, Reconciler, SweepReport};
pub use store::{
    ConfirmationStore, LockStore, MemoryConfirmationStore, MemoryLockStore, MemoryStatusStore,
    StatusStore,
};
pub use types::{ConfirmationState, DispenseLock, ObservedStatus, PendingConfirmation};
