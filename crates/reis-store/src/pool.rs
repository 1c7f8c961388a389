//! # Store Pool Management
//!
//! Connection pool creation and configuration for the SQLite-backed
//! cache store.
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Better concurrent read performance
//! - Readers don't block the sync engine's writes
//! - Better crash recovery

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::migrations;
use crate::store::CacheStore;

// =============================================================================
// Configuration
// =============================================================================

/// Cache store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("~/.local/share/reis/cache.db")
///     .max_connections(4);
/// let store = CacheStore::new(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 4 (one writer, a few concurrent readers)
    pub max_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl StoreConfig {
    /// Creates a new store configuration with the given path.
    ///
    /// The database file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            max_connections: 4,
            connect_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Creates an in-memory store configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let store = CacheStore::new(StoreConfig::in_memory()).await?;
    /// // Store is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        StoreConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            connect_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Pool Construction
// =============================================================================

/// Builds the connection pool and runs migrations.
///
/// ## What This Does
/// 1. Creates the database file if it doesn't exist
/// 2. Configures SQLite:
///    - WAL mode for concurrent reads
///    - NORMAL synchronous (balance of safety/speed)
/// 3. Creates the connection pool
/// 4. Runs migrations (if enabled)
pub(crate) async fn connect(config: &StoreConfig) -> StoreResult<SqlitePool> {
    info!(
        path = %config.database_path.display(),
        "Opening cache store"
    );

    // sqlite://path with mode=rwc creates the file if missing
    let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

    let connect_options = SqliteConnectOptions::from_str(&connect_url)
        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
        // WAL mode: readers don't block the single sync writer
        .journal_mode(SqliteJournalMode::Wal)
        // NORMAL synchronous: safe from corruption, may lose the last
        // transaction on power failure — acceptable for a cache
        .synchronous(SqliteSynchronous::Normal)
        .create_if_missing(true);

    debug!("Connection options configured");

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

    info!(
        max_connections = config.max_connections,
        "Cache store pool created"
    );

    if config.run_migrations {
        migrations::run_migrations(&pool).await?;
    }

    Ok(pool)
}

impl CacheStore {
    /// Opens the cache store described by `config`.
    pub async fn new(config: StoreConfig) -> StoreResult<Self> {
        let pool = connect(&config).await?;
        Ok(CacheStore::from_pool(pool))
    }

    /// Opens an isolated in-memory store (for testing).
    pub async fn in_memory() -> StoreResult<Self> {
        CacheStore::new(StoreConfig::in_memory()).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
