//! # Store Error Types
//!
//! Error types for cache store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds context and categorization            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncError (reis-sync) ← Folded into SyncStatus.error on write paths   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Read-through accessors treat read failures as "no cached value"       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Cache store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database file could not be opened or the pool could not connect.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Storage quota exhausted (disk full).
    ///
    /// ## When This Occurs
    /// - SQLite reports `SQLITE_FULL`
    /// Distinguished from other I/O failures so callers can prompt the
    /// user to free space rather than retry blindly.
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A cached value could not be (de)serialized.
    ///
    /// ## When This Occurs
    /// - A row's JSON no longer matches the requested record type and
    ///   the schema version check did not catch it (manual edits,
    ///   partial downgrade)
    #[error("Corrupt cache entry in {partition}/{key}: {message}")]
    Corrupt {
        partition: String,
        key: String,
        message: String,
    },

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal store error.
    #[error("Internal store error: {0}")]
    Internal(String),
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database(SQLITE_FULL) → StoreError::QuotaExceeded
/// sqlx::Error::Database(other)       → StoreError::QueryFailed
/// sqlx::Error::PoolTimedOut          → StoreError::PoolExhausted
/// Other                              → StoreError::Internal
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLITE_FULL surfaces as "database or disk is full"
                if msg.contains("disk is full") || msg.contains("database is full") {
                    StoreError::QuotaExceeded
                } else {
                    StoreError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,

            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("Pool is closed".to_string()),

            _ => StoreError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
