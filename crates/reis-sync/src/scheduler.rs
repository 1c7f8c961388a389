//! # Recurring Sync Scheduler
//!
//! Timer loops that drive the engine, with cooperative cancellation.
//!
//! ## Loop Behavior
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Recurring Task Loop                                 │
//! │                                                                         │
//! │   tick ──► suspended after auth failure?  ──yes──► skip tick            │
//! │              │ no                                                       │
//! │              ▼                                                          │
//! │            still in flight from last tick? ──yes──► skip tick           │
//! │              │ no                                                       │
//! │              ▼                                                          │
//! │            request_sync(task, scope)                                    │
//! │                                                                         │
//! │   cancel() ──► loop exits; an already-dispatched fetch finishes and     │
//! │               its result is still applied, but no further ticks run.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first tick fires immediately; missed ticks are delayed, not
//! bursted.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use reis_core::{Scope, TaskKey};

use crate::engine::SyncEngine;

// =============================================================================
// Handle
// =============================================================================

/// Handle to a recurring sync loop. Cancel explicitly or by dropping;
/// either way the shutdown channel closes and the loop exits on its
/// next select.
pub struct RecurringHandle {
    shutdown: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RecurringHandle {
    /// Stops the loop and waits for it to exit. An in-flight fetch is
    /// not aborted; it completes and its result is applied.
    pub async fn cancel(self) {
        let _ = self.shutdown.send(()).await;
        let _ = self.task.await;
    }

    /// True until the loop has exited.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

// =============================================================================
// Recurring Loops
// =============================================================================

/// Runs `request_sync(task, scope)` every `every`, starting now.
///
/// Ticks are skipped while the task is suspended by an auth failure or
/// still in flight from a previous tick.
pub fn schedule_recurring(
    engine: SyncEngine,
    task: TaskKey,
    scope: Scope,
    every: Duration,
) -> RecurringHandle {
    let (shutdown, mut shutdown_rx) = mpsc::channel::<()>(1);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(%task, every_secs = every.as_secs(), "Recurring sync scheduled");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if engine.is_suspended(&task) {
                        debug!(%task, "Tick skipped, task suspended");
                        continue;
                    }
                    if engine.is_in_flight(&task) {
                        debug!(%task, "Tick skipped, previous sync still running");
                        continue;
                    }
                    if let Err(error) = engine.request_sync(task.clone(), scope.clone()).await {
                        debug!(%task, %error, "Recurring sync failed");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!(%task, "Recurring sync cancelled");
                    break;
                }
            }
        }
    });

    RecurringHandle {
        shutdown,
        task: handle,
    }
}

/// Runs a full sync every `every`, starting now. Skipped entirely while
/// re-authentication is pending.
pub fn schedule_full_sync(engine: SyncEngine, every: Duration) -> RecurringHandle {
    let (shutdown, mut shutdown_rx) = mpsc::channel::<()>(1);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(every_secs = every.as_secs(), "Full sync scheduled");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if engine.status().auth_required {
                        debug!("Full sync skipped, re-authentication pending");
                        continue;
                    }
                    if let Err(error) = engine.sync_all().await {
                        debug!(%error, "Full sync failed");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Full sync cancelled");
                    break;
                }
            }
        }
    });

    RecurringHandle {
        shutdown,
        task: handle,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::engine::SyncEngine;
    use crate::error::{FetchError, FetchResult};
    use crate::fetch::DomainFetcher;
    use async_trait::async_trait;
    use reis_core::Partition;
    use reis_store::CacheStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
        fail_auth: Arc<AtomicBool>,
    }

    #[async_trait]
    impl DomainFetcher for CountingFetcher {
        fn partition(&self) -> Partition {
            Partition::Exams
        }

        async fn fetch(&self, _scope: &Scope) -> FetchResult<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_auth.load(Ordering::SeqCst) {
                Err(FetchError::Auth)
            } else {
                Ok(serde_json::json!([]))
            }
        }
    }

    async fn engine_with_counter(
        calls: Arc<AtomicUsize>,
        fail_auth: Arc<AtomicBool>,
    ) -> SyncEngine {
        // sqlx opens the SQLite connection on a blocking thread; under a
        // paused clock tokio auto-advances past the pool's acquire
        // timeout before the open completes. Run setup in real time.
        tokio::time::resume();
        let store = CacheStore::in_memory().await.unwrap();
        let mut fetchers: HashMap<Partition, Arc<dyn DomainFetcher>> = HashMap::new();
        fetchers.insert(
            Partition::Exams,
            Arc::new(CountingFetcher { calls, fail_auth }),
        );
        let engine = SyncEngine::with_fetchers(store, SyncConfig::default(), fetchers)
            .await
            .unwrap();
        tokio::time::pause();
        engine
    }

    #[tokio::test(start_paused = true)]
    async fn recurring_loop_ticks_and_cancels() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fail_auth = Arc::new(AtomicBool::new(false));
        let engine = engine_with_counter(Arc::clone(&calls), fail_auth).await;

        let handle = schedule_recurring(
            engine,
            TaskKey::current(Partition::Exams),
            Scope::None,
            Duration::from_secs(60),
        );

        // First tick fires immediately, then every minute.
        tokio::time::sleep(Duration::from_secs(150)).await;
        let before_cancel = calls.load(Ordering::SeqCst);
        assert!(before_cancel >= 2, "expected at least 2 ticks, got {before_cancel}");
        assert!(handle.is_running());

        handle.cancel().await;
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(calls.load(Ordering::SeqCst), before_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_pauses_ticks_until_resume() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fail_auth = Arc::new(AtomicBool::new(true));
        let engine = engine_with_counter(Arc::clone(&calls), Arc::clone(&fail_auth)).await;

        let handle = schedule_recurring(
            engine.clone(),
            TaskKey::current(Partition::Exams),
            Scope::None,
            Duration::from_secs(60),
        );

        tokio::time::sleep(Duration::from_secs(300)).await;
        // The first tick hit the auth wall; later ticks were skipped.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(engine.status().auth_required);

        fail_auth.store(false, Ordering::SeqCst);
        engine.resume();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(calls.load(Ordering::SeqCst) >= 2);

        handle.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fail_auth = Arc::new(AtomicBool::new(false));
        let engine = engine_with_counter(Arc::clone(&calls), fail_auth).await;

        let handle = schedule_recurring(
            engine,
            TaskKey::current(Partition::Exams),
            Scope::None,
            Duration::from_secs(60),
        );
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
