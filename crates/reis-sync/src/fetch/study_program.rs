//! Study program fetcher.
//!
//! Fetches the recommended course table of the student's program. The
//! table is effectively static within a semester, so this fetcher runs
//! on the longest refresh cadence of the set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use reis_core::{Partition, Scope, StudyProgramCourse, StudyProgramData};

use crate::client::SessionClient;
use crate::config::SessionSettings;
use crate::error::{FetchError, FetchResult};

const PLANS_PATH: &str = "/auth/katalog/plany.pl";

/// Fetches the study program course table.
pub struct StudyProgramFetcher {
    client: SessionClient,
    study_id: String,
    period_id: String,
}

impl StudyProgramFetcher {
    pub fn new(client: SessionClient, session: &SessionSettings) -> Self {
        StudyProgramFetcher {
            client,
            study_id: session.study_id.clone(),
            period_id: session.period_id.clone(),
        }
    }
}

#[async_trait]
impl super::DomainFetcher for StudyProgramFetcher {
    fn partition(&self) -> Partition {
        Partition::StudyProgram
    }

    async fn fetch(&self, scope: &Scope) -> FetchResult<Value> {
        let (study_id, period_id) = match scope {
            Scope::None => (self.study_id.as_str(), self.period_id.as_str()),
            Scope::Study {
                study_id,
                period_id,
            } => (study_id.as_str(), period_id.as_str()),
            other => {
                return Err(FetchError::InvalidScope(format!(
                    "study program takes no scope or a study scope, got {other:?}"
                )))
            }
        };

        let body = self
            .client
            .get(
                PLANS_PATH,
                &[
                    ("studium", study_id),
                    ("poc_obdobi", period_id),
                    ("typ_studia", "1"),
                    ("lang", "cz"),
                    ("format", "json"),
                ],
            )
            .await?;

        let program = parse_study_program(&body, Utc::now())?;
        serde_json::to_value(&program).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

// =============================================================================
// Parsing
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProgram {
    #[serde(default)]
    programs: Vec<String>,
    #[serde(default)]
    specializations: Vec<String>,
    final_table: Vec<StudyProgramCourse>,
}

/// Parses the program plan into the cached record, stamped with the
/// fetch time.
pub(crate) fn parse_study_program(
    body: &str,
    now: DateTime<Utc>,
) -> FetchResult<StudyProgramData> {
    let raw: RawProgram =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("study program: {e}")))?;

    Ok(StudyProgramData {
        programs: raw.programs,
        specializations: raw.specializations,
        final_table: raw.final_table,
        last_updated: now,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "programs": ["B-EI Ekonomicka informatika"],
        "specializations": [],
        "finalTable": [
            {
                "semester": "1",
                "category": "P",
                "code": "EBC-ALG",
                "name": "Algoritmizace",
                "completion": "zk",
                "credits": "6",
                "link": "/auth/katalog/syllabus.pl?predmet=159410"
            }
        ]
    }"#;

    #[test]
    fn program_table_parses() {
        let now = Utc::now();
        let program = parse_study_program(FIXTURE, now).unwrap();

        assert_eq!(program.programs.len(), 1);
        assert_eq!(program.final_table.len(), 1);
        assert_eq!(program.final_table[0].code, "EBC-ALG");
        assert_eq!(program.last_updated, now);
    }

    #[test]
    fn missing_table_is_a_parse_error() {
        let err = parse_study_program(r#"{"programs": []}"#, Utc::now()).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
