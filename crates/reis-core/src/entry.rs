//! # Cache Entry Envelope and Addressing Types
//!
//! Everything needed to address a cached value: the partition it lives
//! in, the key within the partition, the task key used to de-duplicate
//! concurrent refreshes, and the scope a fetcher narrows its request
//! with.
//!
//! ## Addressing Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cache Addressing                                 │
//! │                                                                         │
//! │  Partition (object store)        Key                  Value             │
//! │  ────────────────────────        ───────────────      ───────────────   │
//! │  schedule                        "current"            ScheduleData      │
//! │  subjects                        "current"            SubjectsData      │
//! │  assessments                     "EBC-ALG"            Vec<Assessment>   │
//! │  exams                           "current"            Vec<ExamSubject>  │
//! │  study_program                   "current"            StudyProgramData  │
//! │  meta                            "last_sync"          timestamp         │
//! │                                                                         │
//! │  TaskKey = "partition:key", e.g. "assessments:EBC-ALG"                 │
//! │  At most one fetch per TaskKey is ever in flight.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// =============================================================================
// Partition
// =============================================================================

/// A named partition of the persistent cache store.
///
/// Partition names are part of the on-disk format; they mirror the
/// object stores of the browser extension this service replaces and
/// must stay stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Block lessons for the current semester, keyed `"current"`.
    Schedule,

    /// Enrolled subjects with folder links and metadata, keyed `"current"`.
    Subjects,

    /// Per-course assessment results, keyed by course code.
    Assessments,

    /// Exam terms and registrations, keyed `"current"`.
    Exams,

    /// Study program course table, keyed `"current"`.
    StudyProgram,

    /// Sync bookkeeping (last sync timestamp and similar).
    Meta,
}

impl Partition {
    /// Every partition, in wipe order for a full cache clear.
    pub const ALL: [Partition; 6] = [
        Partition::Schedule,
        Partition::Subjects,
        Partition::Assessments,
        Partition::Exams,
        Partition::StudyProgram,
        Partition::Meta,
    ];

    /// Returns the stable storage name of this partition.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Partition::Schedule => "schedule",
            Partition::Subjects => "subjects",
            Partition::Assessments => "assessments",
            Partition::Exams => "exams",
            Partition::StudyProgram => "study_program",
            Partition::Meta => "meta",
        }
    }

    /// Current schema version of the records stored in this partition.
    ///
    /// Bump the relevant constant whenever a record shape changes in a
    /// backwards-incompatible way; entries written under an older
    /// version are treated as absent on read and repopulated by the
    /// next sync.
    pub const fn schema_version(&self) -> u32 {
        match self {
            Partition::Schedule => 2,
            Partition::Subjects => 3,
            Partition::Assessments => 1,
            Partition::Exams => 1,
            Partition::StudyProgram => 1,
            Partition::Meta => 1,
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Partition {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schedule" => Ok(Partition::Schedule),
            "subjects" => Ok(Partition::Subjects),
            "assessments" => Ok(Partition::Assessments),
            "exams" => Ok(Partition::Exams),
            "study_program" => Ok(Partition::StudyProgram),
            "meta" => Ok(Partition::Meta),
            other => Err(CoreError::UnknownPartition(other.to_string())),
        }
    }
}

// =============================================================================
// Cache Entry
// =============================================================================

/// A value stored in the cache, wrapped with freshness metadata.
///
/// Entries are only ever replaced wholesale: a successful sync writes a
/// complete new entry under the same `(partition, key)`, a failed sync
/// leaves the previous entry untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Key within the partition (course code, `"current"`, ...).
    pub key: String,

    /// The typed domain record.
    pub value: T,

    /// When this entry was written by a successful sync.
    pub last_updated: DateTime<Utc>,

    /// Schema version of `T` at write time.
    pub version: u32,
}

impl<T> CacheEntry<T> {
    /// Wraps a freshly fetched value for the given partition.
    pub fn new(partition: Partition, key: impl Into<String>, value: T, now: DateTime<Utc>) -> Self {
        CacheEntry {
            key: key.into(),
            value,
            last_updated: now,
            version: partition.schema_version(),
        }
    }

    /// Age of this entry relative to `now`.
    ///
    /// Clock skew can make `last_updated` lie in the future; age is
    /// clamped to zero in that case so a skewed entry reads as fresh.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_updated).max(Duration::zero())
    }

    /// Returns true if the entry is older than `max_age`.
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) > max_age
    }

    /// Maps the value, keeping the envelope metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheEntry<U> {
        CacheEntry {
            key: self.key,
            value: f(self.value),
            last_updated: self.last_updated,
            version: self.version,
        }
    }
}

// =============================================================================
// Task Key
// =============================================================================

/// Identifies one sync unit (partition + key) for de-duplication.
///
/// Concurrent refresh requests carrying the same task key share a
/// single underlying fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub partition: Partition,
    pub key: String,
}

impl TaskKey {
    pub fn new(partition: Partition, key: impl Into<String>) -> Self {
        TaskKey {
            partition,
            key: key.into(),
        }
    }

    /// Task key for a singleton partition (`"current"` key).
    pub fn current(partition: Partition) -> Self {
        TaskKey::new(partition, crate::CURRENT_KEY)
    }
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.partition, self.key)
    }
}

impl std::str::FromStr for TaskKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (partition, key) = s
            .split_once(':')
            .ok_or_else(|| CoreError::MalformedTaskKey(s.to_string()))?;
        if key.is_empty() {
            return Err(CoreError::EmptyKey);
        }
        Ok(TaskKey {
            partition: partition.parse()?,
            key: key.to_string(),
        })
    }
}

// =============================================================================
// Scope
// =============================================================================

/// Fetcher-specific parameter narrowing what a sync fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// No narrowing; the fetcher uses its configured defaults
    /// (subjects, exams, study program).
    None,

    /// A date range, used by the schedule fetcher.
    DateRange { start: NaiveDate, end: NaiveDate },

    /// Study context (studium + period) overriding the configured one,
    /// accepted by the exams and study-program fetchers.
    Study { study_id: String, period_id: String },

    /// A single course within a study context, used by assessments.
    Course {
        study_id: String,
        period_id: String,
        course_id: String,
    },
}

// =============================================================================
// Schedule Windows
// =============================================================================

/// The two schedule fetch windows used by progressive sync.
///
/// A sync run first fetches the `Bite` window (±2 weeks around today)
/// so the calendar renders quickly, then replaces it with the full
/// `Semester` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleWindow {
    /// Two weeks either side of today.
    Bite,

    /// The whole academic period containing today.
    Semester,
}

impl ScheduleWindow {
    /// Resolves the window to a concrete date range around `today`.
    ///
    /// Semester boundaries follow the university calendar:
    /// - September onwards: winter semester, Sep 1 .. Aug 31 next year
    ///   (both semesters fetched so spring planning works)
    /// - January/February: transition, Sep 1 last year .. Aug 31
    /// - March-August: summer semester, Feb 1 .. Aug 31
    pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            ScheduleWindow::Bite => (today - Duration::days(14), today + Duration::days(14)),
            ScheduleWindow::Semester => {
                let year = today.year();
                let month = today.month();
                // Semester boundaries land on Sep 1 / Feb 1 / Aug 31.
                let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid fixed date");
                if month >= 9 {
                    (ymd(year, 9, 1), ymd(year + 1, 8, 31))
                } else if month <= 2 {
                    (ymd(year - 1, 9, 1), ymd(year, 8, 31))
                } else {
                    (ymd(year, 2, 1), ymd(year, 8, 31))
                }
            }
        }
    }

    /// Scope for this window.
    pub fn scope(&self, today: NaiveDate) -> Scope {
        let (start, end) = self.date_range(today);
        Scope::DateRange { start, end }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn partition_roundtrips_through_str() {
        for p in Partition::ALL {
            assert_eq!(p.as_str().parse::<Partition>().unwrap(), p);
        }
    }

    #[test]
    fn unknown_partition_is_an_error() {
        let err = "grades".parse::<Partition>().unwrap_err();
        assert_eq!(err, CoreError::UnknownPartition("grades".into()));
    }

    #[test]
    fn task_key_display_and_parse() {
        let key = TaskKey::new(Partition::Assessments, "EBC-ALG");
        assert_eq!(key.to_string(), "assessments:EBC-ALG");
        assert_eq!("assessments:EBC-ALG".parse::<TaskKey>().unwrap(), key);
    }

    #[test]
    fn task_key_rejects_missing_separator() {
        assert_eq!(
            "schedule".parse::<TaskKey>().unwrap_err(),
            CoreError::MalformedTaskKey("schedule".into())
        );
        assert_eq!("schedule:".parse::<TaskKey>().unwrap_err(), CoreError::EmptyKey);
    }

    #[test]
    fn entry_staleness() {
        let now = Utc::now();
        let entry = CacheEntry::new(Partition::Schedule, "current", 1u32, now);
        assert!(!entry.is_stale(Duration::minutes(5), now));
        assert!(entry.is_stale(Duration::minutes(5), now + Duration::minutes(6)));
        // A future last_updated (clock skew) never reads as stale.
        assert!(!entry.is_stale(Duration::zero(), now - Duration::minutes(1)));
    }

    #[test]
    fn bite_window_is_four_weeks_around_today() {
        let (start, end) = ScheduleWindow::Bite.date_range(date(2025, 10, 15));
        assert_eq!(start, date(2025, 10, 1));
        assert_eq!(end, date(2025, 10, 29));
    }

    #[test]
    fn semester_window_boundaries() {
        // October: winter semester of the academic year just started.
        assert_eq!(
            ScheduleWindow::Semester.date_range(date(2025, 10, 15)),
            (date(2025, 9, 1), date(2026, 8, 31))
        );
        // January: still the academic year that started last September.
        assert_eq!(
            ScheduleWindow::Semester.date_range(date(2026, 1, 10)),
            (date(2025, 9, 1), date(2026, 8, 31))
        );
        // April: summer semester only.
        assert_eq!(
            ScheduleWindow::Semester.date_range(date(2026, 4, 1)),
            (date(2026, 2, 1), date(2026, 8, 31))
        );
    }

    #[test]
    fn schema_version_is_stamped_into_entries() {
        let entry = CacheEntry::new(Partition::Subjects, "current", (), Utc::now());
        assert_eq!(entry.version, Partition::Subjects.schema_version());
    }
}
