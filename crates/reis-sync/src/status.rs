//! # Sync Status Publishing
//!
//! Observer registry for sync status. The UI layer subscribes here and
//! re-renders on every change; callers that only need a snapshot use
//! [`StatusPublisher::get_status`], which is synchronous and never
//! touches the network or the store.
//!
//! ## Delivery Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Status Delivery                                    │
//! │                                                                         │
//! │   SyncEngine ──update()──► StatusPublisher                              │
//! │                                │                                        │
//! │                 snapshot status, snapshot listeners                     │
//! │                                │                                        │
//! │                  ┌─────────────┼─────────────┐                          │
//! │                  ▼             ▼             ▼                          │
//! │             listener A    listener B    listener C                      │
//! │                                                                         │
//! │   A panicking listener is caught and logged; B and C still run.        │
//! │   Dropping a Subscription removes its listener.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use reis_core::TaskKey;

use crate::error::{FetchError, SyncError};

// =============================================================================
// Status Types
// =============================================================================

/// Broad category of a sync failure, for UI treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Transport failure; next sync retries.
    Network,
    /// Session expired; recurring syncs are suspended until resume.
    Auth,
    /// Response did not match the expected structure.
    Parse,
    /// Persisting the fetched record failed.
    Storage,
    /// Anything else (misconfiguration, missing fetcher).
    Internal,
}

impl From<&SyncError> for FailureKind {
    fn from(err: &SyncError) -> Self {
        match err {
            SyncError::Fetch(FetchError::Network(_)) => FailureKind::Network,
            SyncError::Fetch(FetchError::Auth) => FailureKind::Auth,
            SyncError::Fetch(FetchError::Parse(_)) => FailureKind::Parse,
            SyncError::Storage(_) => FailureKind::Storage,
            _ => FailureKind::Internal,
        }
    }
}

/// The most recent sync failure, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    /// Which task failed ("partition:key").
    pub task: String,

    /// Failure category.
    pub kind: FailureKind,

    /// Human-readable description.
    pub message: String,
}

impl SyncFailure {
    /// Builds a failure record from a task and its error.
    pub fn new(task: &TaskKey, err: &SyncError) -> Self {
        SyncFailure {
            task: task.to_string(),
            kind: FailureKind::from(err),
            message: err.to_string(),
        }
    }
}

/// Snapshot of the sync engine's externally visible state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// True while at least one sync task is in flight.
    pub is_syncing: bool,

    /// When the last successful full sync completed.
    pub last_sync: Option<DateTime<Utc>>,

    /// The most recent failure; cleared when a new sync starts.
    pub error: Option<SyncFailure>,

    /// True after an auth failure, until the session is renewed.
    pub auth_required: bool,
}

// =============================================================================
// Publisher
// =============================================================================

type Listener = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

struct PublisherInner {
    status: RwLock<SyncStatus>,
    listeners: Mutex<HashMap<u64, Listener>>,
    next_id: AtomicU64,
}

/// Thread-safe status holder with synchronous listener delivery.
///
/// Cheap to clone; all clones share the same status and listener set.
#[derive(Clone)]
pub struct StatusPublisher {
    inner: Arc<PublisherInner>,
}

impl Default for StatusPublisher {
    fn default() -> Self {
        StatusPublisher::new()
    }
}

impl StatusPublisher {
    /// Creates a publisher with an idle, error-free status.
    pub fn new() -> Self {
        StatusPublisher {
            inner: Arc::new(PublisherInner {
                status: RwLock::new(SyncStatus::default()),
                listeners: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the current status. Synchronous; safe to call from any
    /// thread, including inside a listener.
    pub fn get_status(&self) -> SyncStatus {
        match self.inner.status.read() {
            Ok(status) => status.clone(),
            // A writer panicked mid-update; the last coherent value is
            // still the best answer available.
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Registers a listener. It is NOT called with the current status on
    /// subscription; pair `subscribe` with an initial `get_status` read.
    ///
    /// The listener runs on the thread that publishes the update, so it
    /// must be quick and must not block on the engine.
    pub fn subscribe(&self, listener: impl Fn(&SyncStatus) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.insert(id, Arc::new(listener));
        }
        debug!(listener_id = id, "Status listener subscribed");
        Subscription {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    /// Applies `mutate` to the status and notifies every listener with
    /// the resulting snapshot.
    ///
    /// Listeners are invoked outside the status lock, from a snapshot of
    /// the listener set, so a listener may call `get_status` or drop its
    /// own subscription without deadlocking.
    pub fn update(&self, mutate: impl FnOnce(&mut SyncStatus)) {
        let snapshot = {
            let mut status = match self.inner.status.write() {
                Ok(status) => status,
                Err(poisoned) => poisoned.into_inner(),
            };
            mutate(&mut status);
            status.clone()
        };

        let listeners: Vec<(u64, Listener)> = match self.inner.listeners.lock() {
            Ok(listeners) => listeners
                .iter()
                .map(|(id, l)| (*id, Arc::clone(l)))
                .collect(),
            Err(_) => return,
        };

        for (id, listener) in listeners {
            let result = catch_unwind(AssertUnwindSafe(|| listener(&snapshot)));
            if result.is_err() {
                error!(listener_id = id, "Status listener panicked, continuing");
            }
        }
    }

    /// Number of live listeners (for tests and diagnostics).
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .map(|l| l.len())
            .unwrap_or(0)
    }
}

/// Handle that keeps a status listener registered. Dropping it removes
/// the listener.
pub struct Subscription {
    inner: Arc<PublisherInner>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.remove(&self.id);
        }
        debug!(listener_id = self.id, "Status listener unsubscribed");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
