//! # Sync Engine
//!
//! The orchestrator: decides when fetchers run, de-duplicates
//! concurrent requests for the same task, persists results, and keeps
//! the published status coherent.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     request_sync(task, scope)                           │
//! │                                                                         │
//! │   task already in flight? ──yes──► subscribe to its outcome ──► await   │
//! │            │ no                                                         │
//! │            ▼                                                            │
//! │   register task, spawn runner, await its outcome                        │
//! │                                                                         │
//! │   runner: publish { isSyncing: true, error: None }                      │
//! │            │                                                            │
//! │            ▼                                                            │
//! │   fetcher.fetch(scope) ──ok──► store.put(CacheEntry)                    │
//! │            │                                                            │
//! │            ▼                                                            │
//! │   unregister task (always, even if every waiter gave up), publish       │
//! │   { isSyncing: any tasks left, error: failure if any },                 │
//! │   broadcast the outcome to waiters                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - At most one fetch per task key is ever in flight; later requesters
//!   share the first requester's outcome.
//! - `is_syncing` is true exactly while the registry is non-empty.
//! - A failed task never touches the previously cached entry.
//! - Fetchers never write to the store; this module is the only writer.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, info, warn};

use reis_core::{
    CacheEntry, Partition, ScheduleWindow, Scope, SubjectsData, TaskKey, CURRENT_KEY,
    META_LAST_SYNC,
};
use reis_store::CacheStore;

use crate::client::SessionClient;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::fetch::{default_fetchers, DomainFetcher};
use crate::status::{StatusPublisher, Subscription, SyncFailure, SyncStatus};

type Outcome = Result<(), SyncError>;

struct EngineInner {
    store: CacheStore,
    config: SyncConfig,
    fetchers: HashMap<Partition, Arc<dyn DomainFetcher>>,

    /// At-most-one fetch per task key; the sender fans the outcome out
    /// to every requester that attached while it was in flight.
    in_flight: Mutex<HashMap<TaskKey, broadcast::Sender<Outcome>>>,

    /// Tasks whose recurring syncs are paused after an auth failure.
    suspended: Mutex<HashSet<TaskKey>>,

    publisher: StatusPublisher,

    /// Bounds concurrent per-course detail fetches during a full sync.
    detail_permits: Arc<Semaphore>,
}

/// The sync orchestrator. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    /// Builds an engine with the standard fetcher set and restores
    /// `last_sync` from the meta partition.
    pub async fn new(store: CacheStore, config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        let client = SessionClient::new(
            &config.session,
            std::time::Duration::from_secs(config.limits.request_timeout_secs),
        )?;
        let fetchers = default_fetchers(&client, &config.session);
        SyncEngine::with_fetchers(store, config, fetchers).await
    }

    /// Builds an engine with a caller-supplied fetcher set. Tests use
    /// this to script fetch outcomes.
    pub async fn with_fetchers(
        store: CacheStore,
        config: SyncConfig,
        fetchers: HashMap<Partition, Arc<dyn DomainFetcher>>,
    ) -> SyncResult<Self> {
        let publisher = StatusPublisher::new();

        // A fresh process still remembers when it last synced.
        let last_sync = store
            .get::<DateTime<Utc>>(Partition::Meta, META_LAST_SYNC)
            .await
            .unwrap_or_default()
            .map(|entry| entry.value);
        if let Some(at) = last_sync {
            publisher.update(|s| s.last_sync = Some(at));
        }

        let detail_permits = Arc::new(Semaphore::new(config.limits.detail_concurrency));
        Ok(SyncEngine {
            inner: Arc::new(EngineInner {
                store,
                config,
                fetchers,
                in_flight: Mutex::new(HashMap::new()),
                suspended: Mutex::new(HashSet::new()),
                publisher,
                detail_permits,
            }),
        })
    }

    /// The underlying cache store (read side for accessors).
    pub fn store(&self) -> &CacheStore {
        &self.inner.store
    }

    /// The active configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Current sync status snapshot. Synchronous.
    pub fn status(&self) -> SyncStatus {
        self.inner.publisher.get_status()
    }

    /// Subscribes to status changes. The listener runs synchronously on
    /// every update; drop the returned handle to unsubscribe.
    pub fn subscribe(
        &self,
        listener: impl Fn(&SyncStatus) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.publisher.subscribe(listener)
    }

    // =========================================================================
    // Sync Requests
    // =========================================================================

    /// Syncs one task, de-duplicated by task key.
    ///
    /// If the task is already in flight, this attaches to the running
    /// fetch and resolves with its outcome; no second network call is
    /// made. Otherwise it registers the task and starts the fetch.
    ///
    /// The fetch runs on its own task: dropping this future (a timeout,
    /// a lost `select!` arm) stops waiting but the fetch still completes
    /// and unregisters itself, so the registry never holds a dead entry.
    pub async fn request_sync(&self, task: TaskKey, scope: Scope) -> SyncResult<()> {
        let (mut receiver, runner) = {
            let mut in_flight = match self.inner.in_flight.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match in_flight.get(&task) {
                Some(sender) => (sender.subscribe(), false),
                None => {
                    let (sender, receiver) = broadcast::channel(1);
                    in_flight.insert(task.clone(), sender);
                    (receiver, true)
                }
            }
        };

        if runner {
            // Published here, not on the runner, so status never trails
            // the registry.
            self.inner.publisher.update(|status| {
                status.is_syncing = true;
                status.error = None;
            });
            info!(%task, "Sync started");

            let engine = self.clone();
            let run_key = task.clone();
            tokio::spawn(async move {
                let outcome = engine.run_task(&run_key, &scope).await;
                engine.finish_task(&run_key, &outcome);
            });
        } else {
            debug!(%task, "Attaching to in-flight sync");
        }

        match receiver.recv().await {
            Ok(outcome) => outcome,
            // Sender dropped without broadcasting (shutdown mid-fetch).
            Err(_) => Err(SyncError::Abandoned),
        }
    }

    /// Dispatches a sync without waiting for it (stale-while-revalidate
    /// path). De-duplication applies as in [`request_sync`].
    ///
    /// [`request_sync`]: SyncEngine::request_sync
    pub fn spawn_sync(&self, task: TaskKey, scope: Scope) {
        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(error) = engine.request_sync(task.clone(), scope).await {
                debug!(%task, %error, "Background sync failed");
            }
        });
    }

    async fn run_task(&self, task: &TaskKey, scope: &Scope) -> Outcome {
        let fetcher = self
            .inner
            .fetchers
            .get(&task.partition)
            .cloned()
            .ok_or(SyncError::NoFetcher(task.partition))?;

        let value = fetcher.fetch(scope).await?;
        let entry = CacheEntry::new(task.partition, task.key.clone(), value, Utc::now());
        self.inner.store.put(task.partition, &entry).await?;
        Ok(())
    }

    /// Unregisters the task and publishes the resulting status. Runs on
    /// every termination path, success or failure.
    fn finish_task(&self, task: &TaskKey, outcome: &Outcome) {
        let (sender, still_syncing) = {
            let mut in_flight = match self.inner.in_flight.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let sender = in_flight.remove(task);
            (sender, !in_flight.is_empty())
        };

        match outcome {
            Ok(()) => {
                info!(%task, "Sync finished");
                self.inner.publisher.update(|status| {
                    status.is_syncing = still_syncing;
                });
            }
            Err(error) => {
                warn!(%task, %error, "Sync failed");
                if error.is_auth() {
                    self.suspend(task.clone());
                }
                let failure = SyncFailure::new(task, error);
                let auth = error.is_auth();
                self.inner.publisher.update(|status| {
                    status.is_syncing = still_syncing;
                    status.error = Some(failure);
                    if auth {
                        status.auth_required = true;
                    }
                });
            }
        }

        if let Some(sender) = sender {
            // Every waiter may have stopped listening by now.
            let _ = sender.send(outcome.clone());
        }
    }

    // =========================================================================
    // Auth Suspension
    // =========================================================================

    fn suspend(&self, task: TaskKey) {
        if let Ok(mut suspended) = self.inner.suspended.lock() {
            suspended.insert(task);
        }
    }

    /// Whether a fetch for `task` is currently outstanding.
    pub fn is_in_flight(&self, task: &TaskKey) -> bool {
        self.inner
            .in_flight
            .lock()
            .map(|in_flight| in_flight.contains_key(task))
            .unwrap_or(false)
    }

    /// Whether recurring syncs for `task` are paused by an auth failure.
    pub fn is_suspended(&self, task: &TaskKey) -> bool {
        self.inner
            .suspended
            .lock()
            .map(|suspended| suspended.contains(task))
            .unwrap_or(false)
    }

    /// Clears all auth suspensions after the session has been renewed.
    /// Recurring schedules pick the tasks back up on their next tick.
    pub fn resume(&self) {
        if let Ok(mut suspended) = self.inner.suspended.lock() {
            suspended.clear();
        }
        self.inner.publisher.update(|status| {
            status.auth_required = false;
            status.error = None;
        });
        info!("Auth suspensions cleared");
    }

    // =========================================================================
    // Full Sync
    // =========================================================================

    /// Syncs everything, the way the periodic timer does.
    ///
    /// Ordering: a quick "first bite" schedule window around today is
    /// fetched first so the UI has fresh lessons immediately, then the
    /// full-semester schedule plus the other domains run concurrently,
    /// then per-course assessments run with bounded concurrency.
    /// Individual failures are reported through the status record, not
    /// propagated; `last_sync` is only advanced when every phase
    /// succeeded.
    pub async fn sync_all(&self) -> SyncResult<()> {
        self.sync_all_on(Utc::now().date_naive()).await
    }

    /// [`sync_all`] with an explicit "today" (deterministic windows).
    ///
    /// [`sync_all`]: SyncEngine::sync_all
    pub async fn sync_all_on(&self, today: NaiveDate) -> SyncResult<()> {
        info!("Full sync started");
        let schedule = TaskKey::current(Partition::Schedule);

        let bite_ok = self
            .log_failure(
                self.request_sync(schedule.clone(), ScheduleWindow::Bite.scope(today))
                    .await,
            );

        let (semester, subjects, exams, program) = tokio::join!(
            self.request_sync(schedule, ScheduleWindow::Semester.scope(today)),
            self.request_sync(TaskKey::current(Partition::Subjects), Scope::None),
            self.request_sync(TaskKey::current(Partition::Exams), Scope::None),
            self.request_sync(TaskKey::current(Partition::StudyProgram), Scope::None),
        );
        let phase_two_ok = self.log_failure(semester)
            & self.log_failure(subjects)
            & self.log_failure(exams)
            & self.log_failure(program);

        let assessments_ok = self.sync_assessments().await;

        if bite_ok && phase_two_ok && assessments_ok {
            self.record_last_sync().await;
        }
        info!("Full sync finished");
        Ok(())
    }

    /// Fetches the assessment sheet of every enrolled subject that has
    /// a numeric id, at most `detail_concurrency` at a time.
    async fn sync_assessments(&self) -> bool {
        let subjects = match self
            .inner
            .store
            .get::<SubjectsData>(Partition::Subjects, CURRENT_KEY)
            .await
        {
            Ok(Some(entry)) => entry.value,
            Ok(None) => {
                debug!("No subjects cached, skipping assessment sync");
                return true;
            }
            Err(error) => {
                warn!(%error, "Could not read subjects, skipping assessment sync");
                return false;
            }
        };

        let session = &self.inner.config.session;
        let mut handles = Vec::new();
        for (code, info) in subjects.data {
            let Some(course_id) = info.subject_id else {
                continue;
            };
            let engine = self.clone();
            let scope = Scope::Course {
                study_id: session.study_id.clone(),
                period_id: session.period_id.clone(),
                course_id,
            };
            let permits = Arc::clone(&self.inner.detail_permits);
            handles.push(tokio::spawn(async move {
                // Closed only if the engine is torn down mid-sync.
                let Ok(_permit) = permits.acquire().await else {
                    return false;
                };
                engine
                    .request_sync(TaskKey::new(Partition::Assessments, code), scope)
                    .await
                    .is_ok()
            }));
        }

        let mut all_ok = true;
        for handle in handles {
            all_ok &= handle.await.unwrap_or(false);
        }
        all_ok
    }

    fn log_failure(&self, outcome: SyncResult<()>) -> bool {
        if let Err(error) = &outcome {
            debug!(%error, "Sync phase failed");
        }
        outcome.is_ok()
    }

    async fn record_last_sync(&self) {
        let now = Utc::now();
        let entry = CacheEntry::new(Partition::Meta, META_LAST_SYNC, now, now);
        if let Err(error) = self.inner.store.put(Partition::Meta, &entry).await {
            warn!(%error, "Could not persist last sync time");
            return;
        }
        self.inner.publisher.update(|status| {
            status.last_sync = Some(now);
        });
    }

    // =========================================================================
    // Cache Clearing
    // =========================================================================

    /// Wipes every partition (logout). Status resets to a fresh state
    /// except listeners, which stay subscribed.
    pub async fn clear_all(&self) -> SyncResult<u64> {
        let removed = self.inner.store.clear_all().await?;
        if let Ok(mut suspended) = self.inner.suspended.lock() {
            suspended.clear();
        }
        self.inner.publisher.update(|status| {
            status.last_sync = None;
            status.error = None;
            status.auth_required = false;
        });
        info!(removed, "Cache cleared");
        Ok(removed)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
