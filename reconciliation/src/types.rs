//! Core types for reconciliation

use atlas_codec::EventType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status as reported by the ledger read path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedStatus {
    /// The ledger has indexed a status
    Known(EventType),
    /// Not yet visible
    Unknown,
}

impl ObservedStatus {
    /// Parse a status string; anything unrecognised counts as unknown
    pub fn parse(s: &str) -> Self {
        EventType::from_long(s).map_or(ObservedStatus::Unknown, ObservedStatus::Known)
    }
}

/// Where a confirmation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConfirmationState {
    /// Waiting for the ledger; `attempt` checks have come back unknown
    Pending {
        /// Unsuccessful checks so far
        attempt: u32,
    },
    /// Ledger shows the submitted status
    Confirmed,
    /// Ledger shows a different status, which replaced the local one
    Overridden {
        /// Status the ledger reported
        ledger_status: EventType,
    },
    /// Retry ceiling reached without confirmation
    FailedConfirm,
}

impl ConfirmationState {
    /// No further checks will run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfirmationState::Pending { .. })
    }
}

/// Optimistic status awaiting ledger confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    /// Ledger topic
    pub topic_id: String,

    /// Status submitted
    pub status: EventType,

    /// Submission time
    pub submitted_at: DateTime<Utc>,

    /// Checks that did not confirm
    pub retry_count: u32,

    /// Current state
    pub state: ConfirmationState,

    /// Last time the ledger was queried
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl PendingConfirmation {
    /// New pending record
    pub fn new(topic_id: impl Into<String>, status: EventType, submitted_at: DateTime<Utc>) -> Self {
        Self {
            topic_id: topic_id.into(),
            status,
            submitted_at,
            retry_count: 0,
            state: ConfirmationState::Pending { attempt: 0 },
            last_checked_at: None,
        }
    }

    /// Ledger agreed, or its status was adopted
    pub fn confirmed(&self) -> bool {
        matches!(
            self.state,
            ConfirmationState::Confirmed | ConfirmationState::Overridden { .. }
        )
    }
}

/// Dispense lock held on a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseLock {
    /// Ledger topic
    pub topic_id: String,

    /// Opaque holder identifier
    pub holder_id: String,

    /// When it was granted
    pub acquired_at: DateTime<Utc>,
}

/// Generate a random holder identifier
pub fn new_holder_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_status_parse() {
        assert_eq!(ObservedStatus::parse("paid"), ObservedStatus::Known(EventType::Paid));
        assert_eq!(ObservedStatus::parse("unknown"), ObservedStatus::Unknown);
        assert_eq!(ObservedStatus::parse(""), ObservedStatus::Unknown);
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = PendingConfirmation::new("0.0.1", EventType::Verified, Utc::now());
        assert_eq!(record.retry_count, 0);
        assert!(!record.confirmed());
        assert!(!record.state.is_terminal());
    }

    #[test]
    fn test_holder_ids_unique() {
        assert_ne!(new_holder_id(), new_holder_id());
    }
}
