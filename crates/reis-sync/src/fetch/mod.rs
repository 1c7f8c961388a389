//! # Domain Fetchers
//!
//! One fetcher per cached domain, behind a uniform async contract.
//!
//! ## Fetcher Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DomainFetcher Rules                                │
//! │                                                                         │
//! │  1. fetch(scope) -> Result<Value, FetchError>                          │
//! │     The Value is the already-typed record, serialized; the engine      │
//! │     persists it verbatim.                                              │
//! │                                                                         │
//! │  2. No retries. The recurring schedule IS the retry policy.            │
//! │                                                                         │
//! │  3. No store access. The engine is the only cache writer.              │
//! │                                                                         │
//! │  4. Parsing is a pure function over the response body so it can be     │
//! │     exercised with fixtures, no network involved.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod assessments;
pub mod exams;
pub mod schedule;
pub mod study_program;
pub mod subjects;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use reis_core::{Partition, Scope};

use crate::client::SessionClient;
use crate::config::SessionSettings;
use crate::error::FetchResult;

pub use assessments::AssessmentsFetcher;
pub use exams::ExamsFetcher;
pub use schedule::ScheduleFetcher;
pub use study_program::StudyProgramFetcher;
pub use subjects::SubjectsFetcher;

/// Uniform contract for fetching one domain from the information system.
#[async_trait]
pub trait DomainFetcher: Send + Sync {
    /// The cache partition this fetcher feeds.
    fn partition(&self) -> Partition;

    /// Fetches and parses one record for `scope`.
    ///
    /// Returns the typed record serialized to JSON; the engine wraps it
    /// in a `CacheEntry` and persists it wholesale.
    async fn fetch(&self, scope: &Scope) -> FetchResult<serde_json::Value>;
}

/// Builds the standard fetcher set, one per data partition.
///
/// The meta partition has no fetcher; the engine writes it directly.
pub fn default_fetchers(
    client: &SessionClient,
    session: &SessionSettings,
) -> HashMap<Partition, Arc<dyn DomainFetcher>> {
    let mut fetchers: HashMap<Partition, Arc<dyn DomainFetcher>> = HashMap::new();
    fetchers.insert(
        Partition::Schedule,
        Arc::new(ScheduleFetcher::new(client.clone(), session)),
    );
    fetchers.insert(
        Partition::Subjects,
        Arc::new(SubjectsFetcher::new(client.clone())),
    );
    fetchers.insert(
        Partition::Assessments,
        Arc::new(AssessmentsFetcher::new(client.clone())),
    );
    fetchers.insert(
        Partition::Exams,
        Arc::new(ExamsFetcher::new(client.clone(), session)),
    );
    fetchers.insert(
        Partition::StudyProgram,
        Arc::new(StudyProgramFetcher::new(client.clone(), session)),
    );
    fetchers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_set_covers_every_data_partition() {
        let session = SessionSettings::default();
        let client = SessionClient::new(&session, Duration::from_secs(5)).unwrap();
        let fetchers = default_fetchers(&client, &session);

        for partition in Partition::ALL {
            if partition == Partition::Meta {
                assert!(!fetchers.contains_key(&partition));
            } else {
                let fetcher = fetchers.get(&partition).unwrap();
                assert_eq!(fetcher.partition(), partition);
            }
        }
    }
}
