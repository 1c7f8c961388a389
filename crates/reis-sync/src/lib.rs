//! # reis-sync: Sync Engine for the REIS Companion
//!
//! This crate provides the background synchronization layer for the
//! REIS Companion: it keeps a local cache of the university information
//! system (schedule, subjects, assessments, exams, study program)
//! fresh, and lets the UI observe sync state.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Engine Architecture                          │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   SyncEngine (Main Orchestrator)                 │  │
//! │  │                                                                  │  │
//! │  │  De-duplicates concurrent requests per task key                  │  │
//! │  │  Single writer to the cache store                                │  │
//! │  │  Publishes status on every transition                            │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ DomainFetchers │  │   Scheduler    │  │  StatusPublisher       │    │
//! │  │                │  │                │  │                        │    │
//! │  │ One per domain │  │ Recurring      │  │ Synchronous snapshot + │    │
//! │  │ Parse, no      │  │ loops, skip    │  │ listener delivery,     │    │
//! │  │ retries, no    │  │ while in       │  │ panic-isolated         │    │
//! │  │ store access   │  │ flight or      │  │                        │    │
//! │  │                │  │ auth-suspended │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                       CacheReader                                │   │
//! │  │                                                                 │   │
//! │  │ Read-through accessors: serve the cached (possibly stale)       │   │
//! │  │ entry immediately, refresh in the background                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`engine`] - Main `SyncEngine` orchestrator
//! - [`scheduler`] - Recurring sync loops with cancellation handles
//! - [`fetch`] - `DomainFetcher` trait and the per-domain fetchers
//! - [`cache`] - Read-through accessors for the UI
//! - [`status`] - `SyncStatus` snapshots and the listener registry
//! - [`client`] - Session-aware HTTP client with auth detection
//! - [`config`] - Sync configuration (session, intervals, staleness)
//! - [`error`] - Fetch and sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reis_store::{CacheStore, StoreConfig};
//! use reis_sync::{scheduler, CacheReader, SyncConfig, SyncEngine};
//!
//! let config = SyncConfig::load_or_default(None);
//! let store = CacheStore::new(StoreConfig::new(db_path)).await?;
//! let engine = SyncEngine::new(store, config).await?;
//!
//! // Periodic full sync, like the extension's 5-minute timer
//! let timer = scheduler::schedule_full_sync(engine.clone(), engine.config().sync_all_interval());
//!
//! // UI side
//! let reader = CacheReader::new(engine.clone());
//! let _sub = engine.subscribe(|status| println!("syncing: {}", status.is_syncing));
//! let schedule = reader.schedule().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod scheduler;
pub mod status;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::CacheReader;
pub use client::SessionClient;
pub use config::{CacheSettings, IntervalSettings, LimitSettings, SessionSettings, SyncConfig};
pub use engine::SyncEngine;
pub use error::{FetchError, FetchResult, SyncError, SyncResult};
pub use fetch::DomainFetcher;
pub use scheduler::{schedule_full_sync, schedule_recurring, RecurringHandle};
pub use status::{FailureKind, StatusPublisher, Subscription, SyncFailure, SyncStatus};
