//! # Domain Error Types
//!
//! Errors that can arise from pure domain operations. I/O-level errors
//! (storage, network) live in `reis-store` and `reis-sync`.

use thiserror::Error;

/// Errors from parsing or validating domain values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A partition name did not match any known store partition.
    ///
    /// ## When This Occurs
    /// - Reading a task key persisted by an older build
    /// - A typo in caller-supplied partition strings
    #[error("Unknown partition: '{0}'")]
    UnknownPartition(String),

    /// A task key string was not of the form `partition:key`.
    #[error("Malformed task key: '{0}'")]
    MalformedTaskKey(String),

    /// A cache key was empty.
    #[error("Cache key must not be empty")]
    EmptyKey,
}
