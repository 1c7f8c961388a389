//! # Sync Error Types
//!
//! Error types for fetch and sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   FetchError    │  │   SyncError     │  │   Caller Policy         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Network        │  │  Fetch(..)      │  │  Auth → suspend the     │ │
//! │  │  Auth           │  │  Storage(..)    │  │  recurring schedule     │ │
//! │  │  Parse          │  │  NoFetcher      │  │  and prompt re-login;   │ │
//! │  │  InvalidScope   │  │  InvalidConfig  │  │  everything else is     │ │
//! │  │                 │  │                 │  │  retried next sync      │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both types are `Clone` because a single fetch outcome is shared by
//! every caller that attached to the in-flight task.

use thiserror::Error;

use reis_core::Partition;

/// Result type alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

// =============================================================================
// Fetch Errors
// =============================================================================

/// Failure of a single domain fetch.
///
/// Fetchers never retry; the recurring schedule is the retry policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure (DNS, connect, timeout, TLS).
    #[error("Network error: {0}")]
    Network(String),

    /// The session has expired: the remote system answered with a login
    /// page (or 401/403) instead of data.
    #[error("Session expired, re-authentication required")]
    Auth,

    /// The response body did not match the expected structure.
    #[error("Unexpected response shape: {0}")]
    Parse(String),

    /// The caller passed a scope this fetcher cannot use.
    ///
    /// Indicates a wiring bug, not a remote problem; never transient.
    #[error("Scope not supported by this fetcher: {0}")]
    InvalidScope(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

// =============================================================================
// Sync Errors
// =============================================================================

/// Failure of a sync task (fetch + persist).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The domain fetch itself failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Persisting the fetched record failed; the previous cache entry
    /// is untouched.
    #[error("Storage error: {0}")]
    Storage(String),

    /// No fetcher is registered for the requested partition.
    #[error("No fetcher registered for partition '{0}'")]
    NoFetcher(Partition),

    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// The engine dropped the task before producing an outcome
    /// (shutdown mid-fetch).
    #[error("Sync task abandoned")]
    Abandoned,
}

impl From<reis_store::StoreError> for SyncError {
    fn from(err: reis_store::StoreError) -> Self {
        SyncError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if this failure means the session must be renewed
    /// before further syncs can succeed.
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Fetch(FetchError::Auth))
    }

    /// Returns true if a later scheduled sync could plausibly succeed
    /// without any user action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Fetch(FetchError::Network(_))
                | SyncError::Fetch(FetchError::Parse(_))
                | SyncError::Storage(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_are_flagged() {
        assert!(SyncError::Fetch(FetchError::Auth).is_auth());
        assert!(!SyncError::Fetch(FetchError::Auth).is_retryable());
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(SyncError::Fetch(FetchError::Network("timeout".into())).is_retryable());
        assert!(SyncError::Storage("disk full".into()).is_retryable());
        assert!(!SyncError::NoFetcher(Partition::Schedule).is_retryable());
        assert!(!SyncError::Fetch(FetchError::InvalidScope("none".into())).is_retryable());
    }
}
