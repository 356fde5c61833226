//! Reconciliation against a scripted ledger
//!
//! Covers:
//! - Immediate confirmation and ledger override
//! - Backoff ceiling with paused tokio time
//! - Dispense lock exclusion and reclaim
//! - Sweep healing after a failed confirmation
//! - Sweep results discarded when a newer submission lands mid-query

use async_trait::async_trait;
use atlas_codec::EventType;
use dashmap::DashMap;
use reconciliation::{
    ConfirmationState, DispenseLocks, LedgerStatusSource, ManualClock, MemoryConfirmationStore,
    MemoryLockStore, MemoryStatusStore, ObservedStatus, ReconcileConfig, Reconciler, SweepReport,
    Transition,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Ledger whose answers are set by the test
#[derive(Debug, Default)]
struct ScriptedLedger {
    statuses: DashMap<String, EventType>,
    failing: AtomicBool,
    queries: AtomicUsize,
}

impl ScriptedLedger {
    fn index(&self, topic_id: &str, status: EventType) {
        self.statuses.insert(topic_id.to_string(), status);
    }

    fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStatusSource for ScriptedLedger {
    async fn current_status(&self, topic_id: &str) -> anyhow::Result<ObservedStatus> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("mirror node unavailable");
        }
        Ok(self
            .statuses
            .get(topic_id)
            .map_or(ObservedStatus::Unknown, |s| ObservedStatus::Known(*s)))
    }
}

/// Ledger that parks every query until released
#[derive(Debug, Default)]
struct GatedLedger {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl LedgerStatusSource for GatedLedger {
    async fn current_status(&self, _topic_id: &str) -> anyhow::Result<ObservedStatus> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(ObservedStatus::Known(EventType::Verified))
    }
}

fn setup() -> (Arc<Reconciler>, Arc<ScriptedLedger>) {
    let ledger = Arc::new(ScriptedLedger::default());
    let reconciler = Reconciler::new(
        ReconcileConfig::default(),
        ledger.clone(),
        Arc::new(MemoryStatusStore::new()),
        Arc::new(MemoryConfirmationStore::new()),
        Arc::new(ManualClock::default()),
    )
    .unwrap();
    (Arc::new(reconciler), ledger)
}

#[tokio::test]
async fn test_matching_ledger_status_confirms() {
    let (reconciler, ledger) = setup();
    reconciler.submit("0.0.100", EventType::Paid);
    ledger.index("0.0.100", EventType::Paid);

    assert_eq!(reconciler.check_once("0.0.100").await, Some(Transition::Confirmed));

    let record = reconciler.pending("0.0.100").unwrap();
    assert!(record.confirmed());
    assert_eq!(record.retry_count, 0);
    assert_eq!(reconciler.local_status("0.0.100"), Some(EventType::Paid));
}

#[tokio::test]
async fn test_conflicting_ledger_status_wins() {
    let (reconciler, ledger) = setup();
    reconciler.submit("0.0.101", EventType::Dispensed);
    ledger.index("0.0.101", EventType::Cancelled);

    reconciler.check_once("0.0.101").await;

    let record = reconciler.pending("0.0.101").unwrap();
    assert!(record.confirmed());
    assert_eq!(
        record.state,
        ConfirmationState::Overridden {
            ledger_status: EventType::Cancelled
        }
    );
    assert_eq!(reconciler.local_status("0.0.101"), Some(EventType::Cancelled));
    assert_eq!(reconciler.check_once("0.0.101").await, None);
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_after_delayed_indexing() {
    let (reconciler, ledger) = setup();
    reconciler.submit("0.0.102", EventType::Verified);
    let handle = reconciler.spawn_confirmation("0.0.102");

    // Invisible for the first two checks (t=2s, t=7s), visible by t=17s
    tokio::time::sleep(Duration::from_secs(8)).await;
    ledger.index("0.0.102", EventType::Verified);

    let state = handle.await.unwrap();
    assert_eq!(state, Some(ConfirmationState::Confirmed));
    assert_eq!(ledger.queries(), 3);
    assert_eq!(reconciler.pending("0.0.102").unwrap().retry_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_submit_and_confirm_schedules_first_check() {
    let (reconciler, ledger) = setup();
    ledger.index("0.0.111", EventType::Paid);

    let started = tokio::time::Instant::now();
    let handle = reconciler.submit_and_confirm("0.0.111", EventType::Paid);
    assert_eq!(reconciler.local_status("0.0.111"), Some(EventType::Paid));

    assert_eq!(handle.await.unwrap(), Some(ConfirmationState::Confirmed));
    assert_eq!(started.elapsed(), Duration::from_secs(2));
    assert_eq!(ledger.queries(), 1);
    assert_eq!(reconciler.pending("0.0.111").unwrap().retry_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_ceiling_marks_failed() {
    let (reconciler, ledger) = setup();
    reconciler.submit("0.0.103", EventType::Issued);

    let started = tokio::time::Instant::now();
    let state = reconciler.run_confirmation("0.0.103").await;

    assert_eq!(state, Some(ConfirmationState::FailedConfirm));
    assert_eq!(ledger.queries(), 5);
    assert_eq!(started.elapsed(), Duration::from_secs(2 + 5 + 10 + 20 + 30));

    let record = reconciler.pending("0.0.103").unwrap();
    assert_eq!(record.retry_count, 5);
    assert!(!record.confirmed());
    assert_eq!(reconciler.local_status("0.0.103"), Some(EventType::Issued));
}

#[tokio::test]
async fn test_query_failure_consumes_retry() {
    let (reconciler, ledger) = setup();
    reconciler.submit("0.0.104", EventType::Paid);
    ledger.failing.store(true, Ordering::SeqCst);

    let transition = reconciler.check_once("0.0.104").await;
    assert!(matches!(transition, Some(Transition::Retry { attempt: 1, .. })));
    assert_eq!(reconciler.pending("0.0.104").unwrap().retry_count, 1);
}

#[tokio::test]
async fn test_resubmission_supersedes_pending_record() {
    let (reconciler, ledger) = setup();
    reconciler.submit("0.0.105", EventType::Verified);
    reconciler.submit("0.0.105", EventType::Paid);
    ledger.index("0.0.105", EventType::Paid);

    assert_eq!(reconciler.check_once("0.0.105").await, Some(Transition::Confirmed));
    assert_eq!(reconciler.pending("0.0.105").unwrap().status, EventType::Paid);
}

#[tokio::test]
async fn test_sweep_heals_failed_confirmation() {
    let (reconciler, ledger) = setup();
    reconciler.submit("0.0.106", EventType::Dispensed);
    reconciler.submit("0.0.107", EventType::Paid);
    reconciler.submit("0.0.108", EventType::Verified);

    ledger.index("0.0.106", EventType::Paid);
    ledger.index("0.0.107", EventType::Paid);

    let report = reconciler.sweep_once().await;
    assert_eq!(
        report,
        SweepReport {
            checked: 3,
            corrected: 1,
            failed: 0
        }
    );
    assert_eq!(reconciler.local_status("0.0.106"), Some(EventType::Paid));
    assert_eq!(reconciler.local_status("0.0.108"), Some(EventType::Verified));
    assert!(reconciler.pending("0.0.107").unwrap().confirmed());
    assert!(!reconciler.pending("0.0.108").unwrap().confirmed());
}

#[tokio::test]
async fn test_sweep_skips_topic_resubmitted_during_query() {
    let ledger = Arc::new(GatedLedger::default());
    let reconciler = Arc::new(
        Reconciler::new(
            ReconcileConfig::default(),
            ledger.clone(),
            Arc::new(MemoryStatusStore::new()),
            Arc::new(MemoryConfirmationStore::new()),
            Arc::new(ManualClock::default()),
        )
        .unwrap(),
    );
    reconciler.submit("0.0.112", EventType::Verified);

    let sweeper = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.sweep_once().await })
    };
    ledger.entered.notified().await;

    reconciler.submit("0.0.112", EventType::Paid);
    ledger.release.notify_one();

    let report = sweeper.await.unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.corrected, 0);
    assert_eq!(reconciler.local_status("0.0.112"), Some(EventType::Paid));
    assert_eq!(
        reconciler.pending("0.0.112").unwrap().state,
        ConfirmationState::Pending { attempt: 0 }
    );
}

#[tokio::test]
async fn test_sweep_counts_failures() {
    let (reconciler, ledger) = setup();
    reconciler.submit("0.0.109", EventType::Issued);
    ledger.failing.store(true, Ordering::SeqCst);

    let report = reconciler.sweep_once().await;
    assert_eq!(report.failed, 1);
    assert_eq!(reconciler.local_status("0.0.109"), Some(EventType::Issued));
}

#[tokio::test(start_paused = true)]
async fn test_background_sweep_runs_on_interval() {
    let (reconciler, ledger) = setup();
    reconciler.submit("0.0.110", EventType::Verified);
    ledger.index("0.0.110", EventType::Cancelled);

    let handle = reconciler.spawn_sweep();
    tokio::time::sleep(Duration::from_secs(61)).await;
    handle.abort();

    assert_eq!(reconciler.local_status("0.0.110"), Some(EventType::Cancelled));
}

#[test]
fn test_dispense_lock_exclusion_and_reclaim() {
    let clock = Arc::new(ManualClock::default());
    let locks = DispenseLocks::new(
        Arc::new(MemoryLockStore::new()),
        clock.clone(),
        ReconcileConfig::default().lock_timeout(),
    );

    assert!(locks.acquire("0.0.200", "pharmacy-1"));
    assert!(!locks.acquire("0.0.200", "pharmacy-2"));

    clock.advance(chrono::Duration::seconds(31));
    assert!(locks.acquire("0.0.200", "pharmacy-2"));
    assert_eq!(locks.holder("0.0.200"), Some("pharmacy-2".to_string()));

    locks.release("0.0.200");
    assert!(!locks.is_locked("0.0.200"));
}

#[test]
fn test_concurrent_acquire_grants_one_holder() {
    let locks = Arc::new(DispenseLocks::in_memory(&ReconcileConfig::default()));

    let granted: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let locks = locks.clone();
                scope.spawn(move || locks.acquire("0.0.300", &format!("holder-{}", i)))
            })
            .collect();
        handles.into_iter().map(|h| usize::from(h.join().unwrap())).sum()
    });

    assert_eq!(granted, 1);
}
