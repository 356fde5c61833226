//! Confirmation state machine
//!
//! Pure transition logic: given a pending record and what the ledger
//! reported, decide the next state. Timers live in the reconciler.

use atlas_codec::EventType;
use std::time::Duration;

use crate::config::ReconcileConfig;
use crate::types::{ConfirmationState, ObservedStatus, PendingConfirmation};

/// Result of querying the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Query answered
    Status(ObservedStatus),
    /// Query itself failed
    QueryFailed(String),
}

/// Decision after one confirmation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Ledger shows the submitted status
    Confirmed,
    /// Ledger shows another concrete status; local status must follow it
    Overridden {
        /// Status to adopt
        ledger_status: EventType,
    },
    /// Check again later
    Retry {
        /// Unsuccessful checks so far
        attempt: u32,
        /// Delay before the next check
        after: Duration,
    },
    /// Retry ceiling reached
    GaveUp {
        /// Unsuccessful checks made
        attempts: u32,
    },
}

/// Backoff schedule and ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
    max_retries: u32,
}

impl RetryPolicy {
    /// Build from explicit delays
    ///
    /// An empty schedule falls back to a single one-second delay.
    pub fn new(delays: Vec<Duration>, max_retries: u32) -> Self {
        let delays = if delays.is_empty() {
            vec![Duration::from_secs(1)]
        } else {
            delays
        };
        Self {
            delays,
            max_retries: max_retries.max(1),
        }
    }

    /// Build from configuration
    pub fn from_config(config: &ReconcileConfig) -> Self {
        Self::new(
            config
                .retry_delays_secs
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            config.max_retries,
        )
    }

    /// Delay before the check following `attempt` unsuccessful ones
    ///
    /// Attempts beyond the schedule reuse its last entry.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = (attempt as usize).min(self.delays.len() - 1);
        self.delays[index]
    }

    /// Delay before the first check
    pub fn initial_delay(&self) -> Duration {
        self.delay_for(0)
    }

    /// Retry ceiling
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ReconcileConfig::default())
    }
}

/// Decide what a check result means for a pending record
pub fn next_transition(
    record: &PendingConfirmation,
    observation: &Observation,
    policy: &RetryPolicy,
) -> Transition {
    match observation {
        Observation::Status(ObservedStatus::Known(status)) if *status == record.status => {
            Transition::Confirmed
        }
        Observation::Status(ObservedStatus::Known(status)) => Transition::Overridden {
            ledger_status: *status,
        },
        Observation::Status(ObservedStatus::Unknown) | Observation::QueryFailed(_) => {
            let attempt = record.retry_count + 1;
            if attempt < policy.max_retries() {
                Transition::Retry {
                    attempt,
                    after: policy.delay_for(attempt),
                }
            } else {
                Transition::GaveUp { attempts: attempt }
            }
        }
    }
}

/// Apply a transition to a record
pub fn apply(record: &mut PendingConfirmation, transition: &Transition) {
    match transition {
        Transition::Confirmed => record.state = ConfirmationState::Confirmed,
        Transition::Overridden { ledger_status } => {
            record.state = ConfirmationState::Overridden {
                ledger_status: *ledger_status,
            }
        }
        Transition::Retry { attempt, .. } => {
            record.retry_count = *attempt;
            record.state = ConfirmationState::Pending { attempt: *attempt };
        }
        Transition::GaveUp { attempts } => {
            record.retry_count = *attempts;
            record.state = ConfirmationState::FailedConfirm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(status: EventType) -> PendingConfirmation {
        PendingConfirmation::new("0.0.42", status, Utc::now())
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        let secs: Vec<u64> = (0..7).map(|a| policy.delay_for(a).as_secs()).collect();
        assert_eq!(secs, vec![2, 5, 10, 20, 30, 30, 30]);
        assert_eq!(policy.initial_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_matching_status_confirms() {
        let mut rec = record(EventType::Paid);
        let obs = Observation::Status(ObservedStatus::Known(EventType::Paid));
        let t = next_transition(&rec, &obs, &RetryPolicy::default());
        assert_eq!(t, Transition::Confirmed);

        apply(&mut rec, &t);
        assert!(rec.confirmed());
        assert_eq!(rec.retry_count, 0);
    }

    #[test]
    fn test_conflicting_status_overrides() {
        let mut rec = record(EventType::Paid);
        let obs = Observation::Status(ObservedStatus::Known(EventType::Cancelled));
        let t = next_transition(&rec, &obs, &RetryPolicy::default());
        assert_eq!(
            t,
            Transition::Overridden {
                ledger_status: EventType::Cancelled
            }
        );

        apply(&mut rec, &t);
        assert!(rec.confirmed());
        assert!(rec.state.is_terminal());
    }

    #[test]
    fn test_unknown_retries_until_ceiling() {
        let policy = RetryPolicy::default();
        let mut rec = record(EventType::Dispensed);
        let obs = Observation::Status(ObservedStatus::Unknown);

        let mut delays = Vec::new();
        loop {
            let t = next_transition(&rec, &obs, &policy);
            apply(&mut rec, &t);
            match t {
                Transition::Retry { after, .. } => delays.push(after.as_secs()),
                Transition::GaveUp { attempts } => {
                    assert_eq!(attempts, 5);
                    break;
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        assert_eq!(delays, vec![5, 10, 20, 30]);
        assert_eq!(rec.state, ConfirmationState::FailedConfirm);
        assert_eq!(rec.retry_count, 5);
        assert!(!rec.confirmed());
    }

    #[test]
    fn test_query_failure_consumes_a_retry() {
        let rec = record(EventType::Issued);
        let t = next_transition(
            &rec,
            &Observation::QueryFailed("mirror node timeout".into()),
            &RetryPolicy::default(),
        );
        assert_eq!(
            t,
            Transition::Retry {
                attempt: 1,
                after: Duration::from_secs(5)
            }
        );
    }

    #[test]
    fn test_empty_schedule_falls_back() {
        let policy = RetryPolicy::new(vec![], 0);
        assert_eq!(policy.delay_for(3), Duration::from_secs(1));
        assert_eq!(policy.max_retries(), 1);
    }
}
