//! Optimistic status with ledger confirmation
//!
//! A submitted status is written locally at once and then confirmed against
//! the ledger read path on the backoff schedule. A concrete ledger status
//! that disagrees wins. The sweep re-checks every tracked topic on a fixed
//! interval and heals whatever the retry loop missed.

use async_trait::async_trait;
use atlas_codec::EventType;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ReconcileConfig;
use crate::machine::{apply, next_transition, Observation, RetryPolicy, Transition};
use crate::store::{ConfirmationStore, MemoryConfirmationStore, MemoryStatusStore, StatusStore};
use crate::types::{ConfirmationState, ObservedStatus, PendingConfirmation};
use crate::Result;

/// Read path of the ledger
#[async_trait]
pub trait LedgerStatusSource: Send + Sync {
    /// Latest status the ledger has indexed for a topic
    async fn current_status(&self, topic_id: &str) -> anyhow::Result<ObservedStatus>;
}

/// Outcome of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Topics queried
    pub checked: usize,
    /// Local statuses overwritten from the ledger
    pub corrected: usize,
    /// Queries that failed
    pub failed: usize,
}

/// Status reconciler
pub struct Reconciler {
    config: ReconcileConfig,
    policy: RetryPolicy,
    source: Arc<dyn LedgerStatusSource>,
    statuses: Arc<dyn StatusStore>,
    confirmations: Arc<dyn ConfirmationStore>,
    clock: Arc<dyn Clock>,
    guard: Mutex<()>,
}

impl Reconciler {
    /// Create reconciler over explicit stores
    pub fn new(
        config: ReconcileConfig,
        source: Arc<dyn LedgerStatusSource>,
        statuses: Arc<dyn StatusStore>,
        confirmations: Arc<dyn ConfirmationStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let policy = RetryPolicy::from_config(&config);

        Ok(Self {
            config,
            policy,
            source,
            statuses,
            confirmations,
            clock,
            guard: Mutex::new(()),
        })
    }

    /// In-memory stores on the system clock
    pub fn in_memory(config: ReconcileConfig, source: Arc<dyn LedgerStatusSource>) -> Result<Self> {
        Self::new(
            config,
            source,
            Arc::new(MemoryStatusStore::new()),
            Arc::new(MemoryConfirmationStore::new()),
            Arc::new(SystemClock),
        )
    }

    /// Active configuration
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Retry schedule in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Record a status optimistically
    ///
    /// The local status changes immediately and a fresh pending record
    /// replaces any earlier one for the topic. When the table is full a
    /// terminal record is evicted first, otherwise the oldest one, and its
    /// local status goes with it.
    pub fn submit(&self, topic_id: &str, status: EventType) -> PendingConfirmation {
        let _guard = self.guard.lock();

        self.statuses.set(topic_id, status);

        if self.confirmations.get(topic_id).is_none()
            && self.confirmations.len() >= self.config.max_tracked_topics
        {
            self.evict_one();
        }

        let record = PendingConfirmation::new(topic_id, status, self.clock.now());
        self.confirmations.set(record.clone());
        info!("Submitted {} for {}, awaiting ledger confirmation", status, topic_id);
        record
    }

    /// Record a status and start confirming it on a background task
    pub fn submit_and_confirm(
        self: &Arc<Self>,
        topic_id: &str,
        status: EventType,
    ) -> JoinHandle<Option<ConfirmationState>> {
        self.submit(topic_id, status);
        self.spawn_confirmation(topic_id)
    }

    /// Local status for a topic
    pub fn local_status(&self, topic_id: &str) -> Option<EventType> {
        self.statuses.get(topic_id)
    }

    /// Confirmation record for a topic
    pub fn pending(&self, topic_id: &str) -> Option<PendingConfirmation> {
        self.confirmations.get(topic_id)
    }

    /// Number of tracked confirmation records
    pub fn tracked(&self) -> usize {
        self.confirmations.len()
    }

    /// Run one confirmation check
    ///
    /// Returns `None` when there is nothing to check: no record, a terminal
    /// record, or a record replaced by a newer submission while the query
    /// was in flight.
    pub async fn check_once(&self, topic_id: &str) -> Option<Transition> {
        let snapshot = self.confirmations.get(topic_id)?;
        if snapshot.state.is_terminal() {
            return None;
        }

        let observation = match self.source.current_status(topic_id).await {
            Ok(status) => Observation::Status(status),
            Err(e) => {
                warn!("Ledger status query for {} failed: {}", topic_id, e);
                Observation::QueryFailed(e.to_string())
            }
        };

        let _guard = self.guard.lock();
        let mut record = self.confirmations.get(topic_id)?;
        if record.submitted_at != snapshot.submitted_at
            || record.status != snapshot.status
            || record.state.is_terminal()
        {
            debug!("Confirmation for {} superseded during check", topic_id);
            return None;
        }

        let transition = next_transition(&record, &observation, &self.policy);
        apply(&mut record, &transition);
        record.last_checked_at = Some(self.clock.now());

        match &transition {
            Transition::Confirmed => info!("Ledger confirmed {} for {}", record.status, topic_id),
            Transition::Overridden { ledger_status } => {
                warn!(
                    "Ledger reports {} for {} (submitted {}), adopting ledger status",
                    ledger_status, topic_id, record.status
                );
                self.statuses.set(topic_id, *ledger_status);
            }
            Transition::Retry { attempt, after } => debug!(
                "{} not yet visible for {}, retry {} in {:?}",
                record.status, topic_id, attempt, after
            ),
            Transition::GaveUp { attempts } => warn!(
                "Gave up confirming {} for {} after {} attempts",
                record.status, topic_id, attempts
            ),
        }

        self.confirmations.set(record);
        Some(transition)
    }

    /// Drive a topic's confirmation to a terminal state
    ///
    /// Waits the initial delay, then checks and backs off until the record
    /// is confirmed, overridden, given up or superseded.
    pub async fn run_confirmation(&self, topic_id: &str) -> Option<ConfirmationState> {
        tokio::time::sleep(self.policy.initial_delay()).await;

        while let Some(transition) = self.check_once(topic_id).await {
            match transition {
                Transition::Retry { after, .. } => tokio::time::sleep(after).await,
                _ => break,
            }
        }

        self.confirmations.get(topic_id).map(|r| r.state)
    }

    /// Run [`Reconciler::run_confirmation`] on a background task
    pub fn spawn_confirmation(
        self: &Arc<Self>,
        topic_id: impl Into<String>,
    ) -> JoinHandle<Option<ConfirmationState>> {
        let this = Arc::clone(self);
        let topic_id = topic_id.into();
        tokio::spawn(async move { this.run_confirmation(&topic_id).await })
    }

    /// Re-query every tracked topic once
    ///
    /// Any concrete ledger status that differs from the local one replaces
    /// it, and an open or failed record is closed accordingly.
    pub async fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        for record in self.confirmations.list() {
            let topic_id = record.topic_id.as_str();
            report.checked += 1;

            let ledger_status = match self.source.current_status(topic_id).await {
                Ok(ObservedStatus::Known(status)) => status,
                Ok(ObservedStatus::Unknown) => continue,
                Err(e) => {
                    debug!("Sweep query for {} failed: {}", topic_id, e);
                    report.failed += 1;
                    continue;
                }
            };

            let _guard = self.guard.lock();
            match self.confirmations.get(topic_id) {
                Some(current)
                    if current.submitted_at == record.submitted_at
                        && current.status == record.status => {}
                _ => {
                    debug!("Sweep result for {} superseded by a newer submission", topic_id);
                    continue;
                }
            }

            if self.statuses.get(topic_id) != Some(ledger_status) {
                warn!(
                    "Sweep correcting {} from {:?} to {}",
                    topic_id,
                    self.statuses.get(topic_id),
                    ledger_status
                );
                self.statuses.set(topic_id, ledger_status);
                report.corrected += 1;
            }

            if let Some(mut current) = self.confirmations.get(topic_id) {
                if !current.confirmed() {
                    current.state = if current.status == ledger_status {
                        ConfirmationState::Confirmed
                    } else {
                        ConfirmationState::Overridden { ledger_status }
                    };
                    current.last_checked_at = Some(self.clock.now());
                    self.confirmations.set(current);
                }
            }
        }

        if report.corrected > 0 || report.failed > 0 {
            info!(
                "Sweep checked {} topics, corrected {}, {} queries failed",
                report.checked, report.corrected, report.failed
            );
        }
        report
    }

    /// Run [`Reconciler::sweep_once`] every sweep interval on a background task
    pub fn spawn_sweep(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let period = self.config.sweep_interval();

        tokio::spawn(async move {
            info!("Starting reconciliation sweep every {:?}", period);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

            loop {
                interval.tick().await;
                this.sweep_once().await;
            }
        })
    }

    fn evict_one(&self) {
        let records = self.confirmations.list();
        let victim = records
            .iter()
            .filter(|r| r.state.is_terminal())
            .min_by_key(|r| r.submitted_at)
            .or_else(|| records.iter().min_by_key(|r| r.submitted_at));

        if let Some(victim) = victim {
            debug!("Evicting confirmation record for {}", victim.topic_id);
            self.confirmations.delete(&victim.topic_id);
            self.statuses.delete(&victim.topic_id);
        }
    }
}
