//! # Read-Through Cache Accessors
//!
//! What the UI actually calls: read the cached entry immediately and,
//! if it is stale or missing, kick off a background refresh. Callers
//! re-read after the status publisher signals the sync finished.
//!
//! ## Stale-While-Revalidate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              read_or_refresh(partition, key, scope, max_age)            │
//! │                                                                         │
//! │   store.get ──missing──► spawn refresh ──► return None (UI shows       │
//! │      │                                      loading state)              │
//! │      ├──fresh──► return entry                                           │
//! │      └──stale──► spawn refresh ──► return STALE entry immediately      │
//! │                                                                         │
//! │   A read failure counts as "missing": degraded but functional.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use reis_core::{
    Assessment, CacheEntry, ExamSubject, Partition, ScheduleData, ScheduleWindow, Scope,
    StudyProgramData, SubjectsData, TaskKey, CURRENT_KEY,
};

use crate::engine::SyncEngine;

/// Read side of the cache, bound to an engine for refresh dispatch.
#[derive(Clone)]
pub struct CacheReader {
    engine: SyncEngine,
}

impl CacheReader {
    pub fn new(engine: SyncEngine) -> Self {
        CacheReader { engine }
    }

    // =========================================================================
    // Generic Accessors
    // =========================================================================

    /// Reads a cached entry without triggering any refresh.
    ///
    /// Storage errors degrade to `None`; the caller cannot tell a read
    /// failure from an empty cache, and does not need to.
    pub async fn read<T: DeserializeOwned>(
        &self,
        partition: Partition,
        key: &str,
    ) -> Option<CacheEntry<T>> {
        match self.engine.store().get(partition, key).await {
            Ok(entry) => entry,
            Err(error) => {
                warn!(%partition, key, %error, "Cache read failed, treating as empty");
                None
            }
        }
    }

    /// Reads a cached entry and dispatches a background refresh if it
    /// is missing or older than `max_age`. Returns the (possibly stale)
    /// entry immediately; never waits for the network.
    pub async fn read_or_refresh<T: DeserializeOwned>(
        &self,
        partition: Partition,
        key: &str,
        scope: Scope,
        max_age: Duration,
    ) -> Option<CacheEntry<T>> {
        let entry = self.read::<T>(partition, key).await;

        let needs_refresh = match &entry {
            None => true,
            Some(entry) => entry.is_stale(max_age, Utc::now()),
        };
        if needs_refresh {
            debug!(%partition, key, "Cache miss or stale, dispatching refresh");
            self.engine
                .spawn_sync(TaskKey::new(partition, key), scope);
        }

        entry
    }

    // =========================================================================
    // Typed Accessors
    // =========================================================================

    /// The current schedule. A stale entry triggers a refresh of the
    /// window around today.
    pub async fn schedule(&self) -> Option<CacheEntry<ScheduleData>> {
        let scope = ScheduleWindow::Bite.scope(Utc::now().date_naive());
        let max_age = self.engine.config().max_age(Partition::Schedule);
        self.read_or_refresh(Partition::Schedule, CURRENT_KEY, scope, max_age)
            .await
    }

    /// The enrolled subjects map.
    pub async fn subjects(&self) -> Option<CacheEntry<SubjectsData>> {
        let max_age = self.engine.config().max_age(Partition::Subjects);
        self.read_or_refresh(Partition::Subjects, CURRENT_KEY, Scope::None, max_age)
            .await
    }

    /// The assessment sheet of one course, keyed by course code.
    ///
    /// Refresh needs the course's numeric id from the subjects cache;
    /// if it is not known yet, the read is served without a refresh and
    /// the next subjects sync will make it available.
    pub async fn assessments(&self, course_code: &str) -> Option<CacheEntry<Vec<Assessment>>> {
        let course_id = self
            .read::<SubjectsData>(Partition::Subjects, CURRENT_KEY)
            .await
            .and_then(|entry| entry.value.data.get(course_code)?.subject_id.clone());

        let Some(course_id) = course_id else {
            debug!(course_code, "No subject id known, serving cache without refresh");
            return self.read(Partition::Assessments, course_code).await;
        };

        let session = &self.engine.config().session;
        let scope = Scope::Course {
            study_id: session.study_id.clone(),
            period_id: session.period_id.clone(),
            course_id,
        };
        let max_age = self.engine.config().max_age(Partition::Assessments);
        self.read_or_refresh(Partition::Assessments, course_code, scope, max_age)
            .await
    }

    /// The exam-term listing.
    pub async fn exams(&self) -> Option<CacheEntry<Vec<ExamSubject>>> {
        let max_age = self.engine.config().max_age(Partition::Exams);
        self.read_or_refresh(Partition::Exams, CURRENT_KEY, Scope::None, max_age)
            .await
    }

    /// The study program course table.
    pub async fn study_program(&self) -> Option<CacheEntry<StudyProgramData>> {
        let max_age = self.engine.config().max_age(Partition::StudyProgram);
        self.read_or_refresh(Partition::StudyProgram, CURRENT_KEY, Scope::None, max_age)
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::error::FetchResult;
    use crate::fetch::DomainFetcher;
    use async_trait::async_trait;
    use reis_store::CacheStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingFetcher {
        partition: Partition,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DomainFetcher for CountingFetcher {
        fn partition(&self) -> Partition {
            self.partition
        }

        async fn fetch(&self, _scope: &Scope) -> FetchResult<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({"blockLessons": []}))
        }
    }

    async fn engine_with_counter(calls: Arc<AtomicUsize>) -> SyncEngine {
        let store = CacheStore::in_memory().await.unwrap();
        let mut fetchers: HashMap<Partition, Arc<dyn DomainFetcher>> = HashMap::new();
        fetchers.insert(
            Partition::Schedule,
            Arc::new(CountingFetcher {
                partition: Partition::Schedule,
                calls,
            }),
        );
        SyncEngine::with_fetchers(store, SyncConfig::default(), fetchers)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn missing_entry_reads_as_none_and_refreshes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with_counter(Arc::clone(&calls)).await;
        let reader = CacheReader::new(engine.clone());

        let entry = reader.schedule().await;
        assert!(entry.is_none());

        // The refresh is a spawned task; wait for it to land.
        for _ in 0..50 {
            if calls.load(Ordering::SeqCst) > 0 && !engine.status().is_syncing {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let entry = reader.schedule().await;
        assert!(entry.is_some());
    }

    #[tokio::test]
    async fn fresh_entry_does_not_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with_counter(Arc::clone(&calls)).await;
        let reader = CacheReader::new(engine.clone());

        engine
            .request_sync(
                TaskKey::current(Partition::Schedule),
                ScheduleWindow::Bite.scope(Utc::now().date_naive()),
            )
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let entry = reader.schedule().await;
        assert!(entry.is_some());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        // Entry was fresh; no second fetch dispatched.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_entry_is_served_while_one_refresh_dispatches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with_counter(Arc::clone(&calls)).await;
        let reader = CacheReader::new(engine.clone());

        engine
            .request_sync(
                TaskKey::current(Partition::Schedule),
                ScheduleWindow::Bite.scope(Utc::now().date_naive()),
            )
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // max_age of zero makes any cached entry stale.
        let entry: Option<CacheEntry<ScheduleData>> = reader
            .read_or_refresh(
                Partition::Schedule,
                CURRENT_KEY,
                ScheduleWindow::Bite.scope(Utc::now().date_naive()),
                Duration::zero(),
            )
            .await;
        // The stale value is still served immediately.
        assert!(entry.is_some());

        for _ in 0..50 {
            if calls.load(Ordering::SeqCst) > 1 && !engine.status().is_syncing {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        // Exactly one background refresh was dispatched.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn plain_read_never_refreshes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with_counter(Arc::clone(&calls)).await;
        let reader = CacheReader::new(engine);

        let entry: Option<CacheEntry<ScheduleData>> =
            reader.read(Partition::Schedule, CURRENT_KEY).await;
        assert!(entry.is_none());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
