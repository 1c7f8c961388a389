//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. TOML Config File                                                   │
//! │     ~/.config/reis-companion/sync.toml (Linux)                         │
//! │     ~/Library/Application Support/com.reis.companion/sync.toml (macOS) │
//! │                                                                         │
//! │  2. Default Values                                                     │
//! │     5-minute full sync, per-domain staleness thresholds                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [session]
//! base_url = "https://is.mendelu.cz"
//! cookie = "UISAuth=..."
//! user_id = "12345"
//! study_id = "9001"   # studium
//! period_id = "801"   # obdobi
//!
//! [intervals]
//! sync_all_secs = 300
//!
//! [cache]
//! schedule_max_age_secs = 300
//! study_program_max_age_secs = 86400
//!
//! [limits]
//! detail_concurrency = 3
//! request_timeout_secs = 30
//! ```

use std::path::PathBuf;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use reis_core::Partition;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Session Settings
// =============================================================================

/// Where and as whom to talk to the information system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Base URL of the information system.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Session cookie value, captured at login. Empty means
    /// unauthenticated; every fetch will fail with an auth error.
    #[serde(default)]
    pub cookie: String,

    /// The student's IS user id (`rozvrh_student` parameter).
    #[serde(default)]
    pub user_id: String,

    /// Active study id (`studium` parameter).
    #[serde(default)]
    pub study_id: String,

    /// Active study period id (`obdobi` parameter).
    #[serde(default)]
    pub period_id: String,
}

fn default_base_url() -> String {
    "https://is.mendelu.cz".to_string()
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            base_url: default_base_url(),
            cookie: String::new(),
            user_id: String::new(),
            study_id: String::new(),
            period_id: String::new(),
        }
    }
}

// =============================================================================
// Interval Settings
// =============================================================================

/// Recurring sync cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalSettings {
    /// Full sync interval in seconds. The extension historically synced
    /// every 5 minutes; keep that default.
    #[serde(default = "default_sync_all")]
    pub sync_all_secs: u64,
}

fn default_sync_all() -> u64 {
    300
}

impl Default for IntervalSettings {
    fn default() -> Self {
        IntervalSettings {
            sync_all_secs: default_sync_all(),
        }
    }
}

// =============================================================================
// Cache Staleness Settings
// =============================================================================

/// Per-domain `max_age` thresholds for the read-through accessors.
///
/// There is deliberately no single global default: each accessor's
/// threshold is explicit here, scaled by how volatile the domain is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Schedule changes matter within the day.
    #[serde(default = "default_schedule_max_age")]
    pub schedule_max_age_secs: u64,

    /// Subject enrollment changes rarely mid-semester.
    #[serde(default = "default_subjects_max_age")]
    pub subjects_max_age_secs: u64,

    /// Assessment sheets update after classes; half-hourly is plenty.
    #[serde(default = "default_assessments_max_age")]
    pub assessments_max_age_secs: u64,

    /// Exam term capacities move quickly during registration season.
    #[serde(default = "default_exams_max_age")]
    pub exams_max_age_secs: u64,

    /// The study program table is effectively static.
    #[serde(default = "default_study_program_max_age")]
    pub study_program_max_age_secs: u64,
}

fn default_schedule_max_age() -> u64 {
    300 // 5 min
}
fn default_subjects_max_age() -> u64 {
    1800 // 30 min
}
fn default_assessments_max_age() -> u64 {
    1800 // 30 min
}
fn default_exams_max_age() -> u64 {
    900 // 15 min
}
fn default_study_program_max_age() -> u64 {
    86_400 // 24 h
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            schedule_max_age_secs: default_schedule_max_age(),
            subjects_max_age_secs: default_subjects_max_age(),
            assessments_max_age_secs: default_assessments_max_age(),
            exams_max_age_secs: default_exams_max_age(),
            study_program_max_age_secs: default_study_program_max_age(),
        }
    }
}

// =============================================================================
// Limits
// =============================================================================

/// Concurrency and transport limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSettings {
    /// How many per-course detail fetches (assessments) run at once
    /// during a full sync.
    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_detail_concurrency() -> usize {
    3
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for LimitSettings {
    fn default() -> Self {
        LimitSettings {
            detail_concurrency: default_detail_concurrency(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Session and endpoint settings.
    #[serde(default)]
    pub session: SessionSettings,

    /// Recurring sync cadence.
    #[serde(default)]
    pub intervals: IntervalSettings,

    /// Read-through staleness thresholds.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Concurrency and transport limits.
    #[serde(default)]
    pub limits: LimitSettings,
}

impl SyncConfig {
    /// Default config file path, e.g. `~/.config/reis-companion/sync.toml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "reis", "reis-companion")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    /// Loads the config from `path` (or the default location), falling
    /// back to defaults if the file does not exist.
    pub fn load_or_default(path: Option<PathBuf>) -> Self {
        let Some(path) = path.or_else(Self::default_path) else {
            warn!("No config directory available, using default sync config");
            return SyncConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded sync config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid sync config, using defaults");
                    SyncConfig::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "No sync config file, using defaults");
                SyncConfig::default()
            }
        }
    }

    /// Saves the config to `path` (or the default location).
    pub fn save(&self, path: Option<PathBuf>) -> SyncResult<()> {
        let path = path
            .or_else(Self::default_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config directory available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let raw = toml::to_string_pretty(self)?;
        std::fs::write(&path, raw).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(path = %path.display(), "Saved sync config");
        Ok(())
    }

    /// Validates settings that would make every sync fail.
    pub fn validate(&self) -> SyncResult<()> {
        if self.session.base_url.is_empty() {
            return Err(SyncError::InvalidConfig("base_url must not be empty".into()));
        }
        url::Url::parse(&self.session.base_url)
            .map_err(|e| SyncError::InvalidConfig(format!("base_url: {e}")))?;

        if self.limits.detail_concurrency == 0 {
            return Err(SyncError::InvalidConfig(
                "detail_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The documented staleness threshold for a partition's accessor.
    pub fn max_age(&self, partition: Partition) -> Duration {
        let secs = match partition {
            Partition::Schedule => self.cache.schedule_max_age_secs,
            Partition::Subjects => self.cache.subjects_max_age_secs,
            Partition::Assessments => self.cache.assessments_max_age_secs,
            Partition::Exams => self.cache.exams_max_age_secs,
            Partition::StudyProgram => self.cache.study_program_max_age_secs,
            // Meta entries are bookkeeping; never refreshed by age.
            // Stays within chrono's millisecond bound.
            Partition::Meta => (i64::MAX / 1_000) as u64,
        };
        Duration::seconds(secs as i64)
    }

    /// Full sync interval as a std duration (for tokio timers).
    pub fn sync_all_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.intervals.sync_all_secs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
