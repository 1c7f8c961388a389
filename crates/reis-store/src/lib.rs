//! # reis-store: Persistent Cache Store
//!
//! SQLite-backed implementation of the partitioned key/value store the
//! sync engine persists into and the UI reads from.
//!
//! ## Storage Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      cache_entries Table                                │
//! │                                                                         │
//! │  partition    | key       | value (JSON)     | last_updated | version  │
//! │  ─────────────┼───────────┼──────────────────┼──────────────┼───────── │
//! │  schedule     | current   | {blockLessons:…} | 2026-02-…    | 2        │
//! │  subjects     | current   | {data:{…}}       | 2026-02-…    | 3        │
//! │  assessments  | EBC-ALG   | [{name:…}]       | 2026-02-…    | 1        │
//! │  meta         | last_sync | "2026-02-…"      | 2026-02-…    | 1        │
//! │                                                                         │
//! │  PRIMARY KEY (partition, key) — put() is one upsert statement,         │
//! │  so a reader sees either the old row or the new row, never a mix.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Guarantees
//! - `put` is atomic per `(partition, key)`: SQLite statement atomicity
//!   means a concurrent `get` observes the previous entry or the new
//!   one, never a torn value.
//! - A `put` completed before a `get` in the same process is visible to
//!   that `get` (single pool, WAL mode).
//! - Failures (disk full, I/O) surface as [`StoreError`]; swallowing is
//!   the caller's policy, never this crate's.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use pool::StoreConfig;
pub use store::CacheStore;
