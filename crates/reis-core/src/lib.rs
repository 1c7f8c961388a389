//! # reis-core: Pure Domain Model for the REIS Companion
//!
//! This crate holds the domain types shared by the cache store and the
//! sync engine. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      REIS Companion Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI Layer (out of tree)                       │   │
//! │  │    Schedule view ──► Subjects view ──► Exams view              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ read-through accessors                 │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    reis-sync (Sync Engine)                      │   │
//! │  │    Fetchers, orchestrator, status pub/sub, cache accessors     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ reis-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │  records  │  │   entry   │  │   error   │                  │   │
//! │  │   │ Schedule  │  │ Partition │  │ CoreError │                  │   │
//! │  │   │ Subjects  │  │ CacheEntry│  │           │                  │   │
//! │  │   │ Exams ... │  │ TaskKey   │  │           │                  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE TYPES               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    reis-store (Cache Store)                     │   │
//! │  │             SQLite-backed partitioned key/value store           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`records`] - Domain records (schedule, subjects, assessments, exams, study program)
//! - [`entry`] - Cache entry envelope, partitions, task keys, scopes
//! - [`error`] - Domain error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod entry;
pub mod error;
pub mod records;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use entry::{CacheEntry, Partition, ScheduleWindow, Scope, TaskKey};
pub use error::CoreError;
pub use records::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Key under which "the one" record of a singleton partition is stored.
///
/// Schedule, subjects, exams and study-program data all have a single
/// current value per user; course-scoped partitions (assessments) use
/// the course code as key instead.
pub const CURRENT_KEY: &str = "current";

/// Meta-partition key recording the wall-clock time of the last
/// fully-successful sync.
pub const META_LAST_SYNC: &str = "last_sync";
