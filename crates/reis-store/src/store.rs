//! # Cache Store Operations
//!
//! The partitioned key/value operations: get / put / delete / clear.
//!
//! ## Single-Writer Discipline
//! Only the sync engine writes here (fetchers hand their results to the
//! engine, which persists them). Reads come from the read-through
//! accessors on the UI path. Each `put` is one upsert statement, so the
//! atomic-replace invariant holds without explicit transactions.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use reis_core::{CacheEntry, Partition};

use crate::error::{StoreError, StoreResult};

/// Handle to the partitioned cache store.
///
/// Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct CacheStore {
    pool: SqlitePool,
}

impl CacheStore {
    /// Wraps an existing pool (used by [`CacheStore::new`] and tests).
    pub(crate) fn from_pool(pool: SqlitePool) -> Self {
        CacheStore { pool }
    }

    /// Returns a reference to the connection pool.
    ///
    /// For diagnostics; prefer the typed operations below.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checks if the store is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Fetches the entry under `(partition, key)`.
    ///
    /// ## Returns
    /// - `Ok(Some(entry))` - a current-schema entry exists
    /// - `Ok(None)` - no entry, or the entry was written under an older
    ///   schema version (it reads as absent and the next sync replaces it)
    /// - `Err(StoreError)` - query or deserialization failure
    pub async fn get<T: DeserializeOwned>(
        &self,
        partition: Partition,
        key: &str,
    ) -> StoreResult<Option<CacheEntry<T>>> {
        let row = sqlx::query(
            r#"
            SELECT value, last_updated, schema_version
            FROM cache_entries
            WHERE partition = ?1 AND key = ?2
            "#,
        )
        .bind(partition.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored_version: u32 = row.try_get::<i64, _>("schema_version")? as u32;
        if stored_version != partition.schema_version() {
            debug!(
                partition = %partition,
                key = %key,
                stored_version,
                current_version = partition.schema_version(),
                "Ignoring cache entry with outdated schema"
            );
            return Ok(None);
        }

        let raw: String = row.try_get("value")?;
        let last_updated: DateTime<Utc> = row.try_get("last_updated")?;

        let value: T = serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
            partition: partition.to_string(),
            key: key.to_string(),
            message: e.to_string(),
        })?;

        Ok(Some(CacheEntry {
            key: key.to_string(),
            value,
            last_updated,
            version: stored_version,
        }))
    }

    /// Lists all keys currently present in a partition.
    pub async fn keys(&self, partition: Partition) -> StoreResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT key FROM cache_entries
            WHERE partition = ?1
            ORDER BY key
            "#,
        )
        .bind(partition.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("key").map_err(StoreError::from))
            .collect()
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Writes an entry, replacing any previous value wholesale.
    ///
    /// One upsert statement; a concurrent reader observes the old entry
    /// or the new one, never a mixture.
    pub async fn put<T: Serialize>(
        &self,
        partition: Partition,
        entry: &CacheEntry<T>,
    ) -> StoreResult<()> {
        let raw = serde_json::to_string(&entry.value).map_err(|e| StoreError::Corrupt {
            partition: partition.to_string(),
            key: entry.key.clone(),
            message: e.to_string(),
        })?;

        debug!(
            partition = %partition,
            key = %entry.key,
            bytes = raw.len(),
            "Writing cache entry"
        );

        sqlx::query(
            r#"
            INSERT INTO cache_entries (partition, key, value, last_updated, schema_version)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (partition, key) DO UPDATE SET
                value = excluded.value,
                last_updated = excluded.last_updated,
                schema_version = excluded.schema_version
            "#,
        )
        .bind(partition.as_str())
        .bind(&entry.key)
        .bind(&raw)
        .bind(entry.last_updated)
        .bind(entry.version as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes the entry under `(partition, key)`. Missing keys are not
    /// an error.
    pub async fn delete(&self, partition: Partition, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM cache_entries WHERE partition = ?1 AND key = ?2")
            .bind(partition.as_str())
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Removes every entry in a partition.
    pub async fn clear(&self, partition: Partition) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE partition = ?1")
            .bind(partition.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Wipes all partitions (logout / explicit cache reset).
    pub async fn clear_all(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cache_entries")
            .execute(&self.pool)
            .await?;

        warn!(removed = result.rows_affected(), "Cleared entire cache store");
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use reis_core::{
        Assessment, BlockLesson, ExamSection, ExamSubject, Room, ScheduleData, SectionStatus,
        StudyProgramCourse, StudyProgramData, SubjectInfo, SubjectsData, CURRENT_KEY,
    };
    use std::collections::BTreeMap;

    fn sample_schedule() -> ScheduleData {
        ScheduleData {
            block_lessons: vec![BlockLesson {
                date: "20251022".into(),
                start_time: "15:00".into(),
                end_time: "16:50".into(),
                room: "Q01".into(),
                room_structured: Room {
                    name: "Q01".into(),
                    id: "321".into(),
                },
                campus: "Brno".into(),
                faculty_code: "PEF".into(),
                id: "1".into(),
                course_id: "159410".into(),
                study_id: "9001".into(),
                period_id: "801".into(),
                course_code: "EBC-ALG".into(),
                course_name: "Algoritmizace".into(),
                is_seminar: true,
                is_consultation: false,
                is_default_campus: true,
                is_exam: None,
                teachers: vec![],
            }],
        }
    }

    fn sample_subjects() -> SubjectsData {
        let mut data = BTreeMap::new();
        data.insert(
            "EBC-ALG".to_string(),
            SubjectInfo {
                display_name: "Algoritmizace".into(),
                full_name: "Algoritmizace (EBC-ALG)".into(),
                name_cs: Some("Algoritmizace".into()),
                name_en: Some("Algorithmisation".into()),
                subject_code: "EBC-ALG".into(),
                subject_id: Some("159410".into()),
                group_id: None,
                folder_url: "/auth/dok_server/slozka.pl?id=1".into(),
                fetched_at: Utc::now(),
            },
        );
        SubjectsData {
            version: 3,
            last_updated: Utc::now(),
            data,
        }
    }

    async fn store() -> CacheStore {
        CacheStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn get_on_empty_partition_is_none() {
        let store = store().await;
        let got: Option<CacheEntry<ScheduleData>> =
            store.get(Partition::Schedule, CURRENT_KEY).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn put_then_get_roundtrips_all_record_shapes() {
        let store = store().await;
        let now = Utc::now();

        let schedule = sample_schedule();
        store
            .put(
                Partition::Schedule,
                &CacheEntry::new(Partition::Schedule, CURRENT_KEY, schedule.clone(), now),
            )
            .await
            .unwrap();

        let subjects = sample_subjects();
        store
            .put(
                Partition::Subjects,
                &CacheEntry::new(Partition::Subjects, CURRENT_KEY, subjects.clone(), now),
            )
            .await
            .unwrap();

        let assessments = vec![Assessment {
            name: "Midterm".into(),
            score: 18.0,
            max_score: 20.0,
            success_rate: 74.5,
            submitted_date: "22.10.2025".into(),
            teacher: "Dr. Novak".into(),
            detail_url: None,
        }];
        store
            .put(
                Partition::Assessments,
                &CacheEntry::new(Partition::Assessments, "EBC-ALG", assessments.clone(), now),
            )
            .await
            .unwrap();

        let exams = vec![ExamSubject {
            version: 1,
            id: "159410".into(),
            name: "Algoritmizace".into(),
            code: "EBC-ALG".into(),
            sections: vec![ExamSection {
                id: "s1".into(),
                name: "zkouška".into(),
                kind: "zk".into(),
                status: SectionStatus::Available,
                registered_term: None,
                terms: vec![],
            }],
        }];
        store
            .put(
                Partition::Exams,
                &CacheEntry::new(Partition::Exams, CURRENT_KEY, exams.clone(), now),
            )
            .await
            .unwrap();

        let program = StudyProgramData {
            programs: vec!["B-SYI".into()],
            specializations: vec![],
            final_table: vec![StudyProgramCourse {
                semester: "ZS 2025/2026".into(),
                category: "P".into(),
                code: "EBC-ALG".into(),
                name: "Algoritmizace".into(),
                completion: "zk".into(),
                credits: "6".into(),
                link: "/katalog/syllabus.pl?predmet=159410".into(),
            }],
            last_updated: now,
        };
        store
            .put(
                Partition::StudyProgram,
                &CacheEntry::new(Partition::StudyProgram, CURRENT_KEY, program.clone(), now),
            )
            .await
            .unwrap();

        // Deep-equal round trip for every shape.
        let got: CacheEntry<ScheduleData> = store
            .get(Partition::Schedule, CURRENT_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.value, schedule);

        let got: CacheEntry<SubjectsData> = store
            .get(Partition::Subjects, CURRENT_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.value, subjects);

        let got: CacheEntry<Vec<Assessment>> = store
            .get(Partition::Assessments, "EBC-ALG")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.value, assessments);

        let got: CacheEntry<Vec<ExamSubject>> = store
            .get(Partition::Exams, CURRENT_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.value, exams);

        let got: CacheEntry<StudyProgramData> = store
            .get(Partition::StudyProgram, CURRENT_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.value, program);
    }

    #[tokio::test]
    async fn put_replaces_wholesale() {
        let store = store().await;
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::minutes(5);

        store
            .put(
                Partition::Assessments,
                &CacheEntry::new(Partition::Assessments, "EBC-ALG", vec![1, 2, 3], t1),
            )
            .await
            .unwrap();
        store
            .put(
                Partition::Assessments,
                &CacheEntry::new(Partition::Assessments, "EBC-ALG", vec![9], t2),
            )
            .await
            .unwrap();

        let got: CacheEntry<Vec<i32>> = store
            .get(Partition::Assessments, "EBC-ALG")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.value, vec![9]);
        assert_eq!(got.last_updated, t2);
    }

    #[tokio::test]
    async fn outdated_schema_version_reads_as_absent() {
        let store = store().await;

        // Hand-construct an entry stamped with a version that is no
        // longer current.
        let stale = CacheEntry {
            key: CURRENT_KEY.to_string(),
            value: serde_json::json!({"blockLessons": []}),
            last_updated: Utc::now(),
            version: Partition::Schedule.schema_version() - 1,
        };
        store.put(Partition::Schedule, &stale).await.unwrap();

        let got: Option<CacheEntry<serde_json::Value>> =
            store.get(Partition::Schedule, CURRENT_KEY).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn corrupt_json_surfaces_as_error() {
        let store = store().await;
        let now = Utc::now();

        store
            .put(
                Partition::Schedule,
                &CacheEntry::new(Partition::Schedule, CURRENT_KEY, vec![1, 2], now),
            )
            .await
            .unwrap();

        // Ask for an incompatible type.
        let err = store
            .get::<ScheduleData>(Partition::Schedule, CURRENT_KEY)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let store = store().await;
        let now = Utc::now();

        for key in ["EBC-ALG", "EBC-DBS"] {
            store
                .put(
                    Partition::Assessments,
                    &CacheEntry::new(Partition::Assessments, key, vec![1], now),
                )
                .await
                .unwrap();
        }
        store
            .put(
                Partition::Meta,
                &CacheEntry::new(Partition::Meta, "last_sync", now, now),
            )
            .await
            .unwrap();

        store.delete(Partition::Assessments, "EBC-ALG").await.unwrap();
        assert_eq!(store.keys(Partition::Assessments).await.unwrap(), vec!["EBC-DBS"]);

        // Clearing one partition leaves the others alone.
        assert_eq!(store.clear(Partition::Assessments).await.unwrap(), 1);
        assert!(store
            .get::<DateTime<Utc>>(Partition::Meta, "last_sync")
            .await
            .unwrap()
            .is_some());

        assert_eq!(store.clear_all().await.unwrap(), 1);
        assert!(store.keys(Partition::Meta).await.unwrap().is_empty());
    }
}
