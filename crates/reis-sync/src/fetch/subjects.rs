//! Subjects fetcher.
//!
//! Fetches the enrolled-subjects listing and derives the per-code
//! subject map: the course code is the first token of the full name,
//! the display name is the full name with its trailing parenthetical
//! stripped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use reis_core::{Partition, Scope, SubjectInfo, SubjectsData};

use crate::client::SessionClient;
use crate::error::{FetchError, FetchResult};

const SUBJECTS_PATH: &str = "/auth/student/list.pl";

/// Version stamp written into every subjects record.
const SUBJECTS_RECORD_VERSION: u32 = 1;

/// Fetches the map of enrolled subjects.
pub struct SubjectsFetcher {
    client: SessionClient,
}

impl SubjectsFetcher {
    pub fn new(client: SessionClient) -> Self {
        SubjectsFetcher { client }
    }
}

#[async_trait]
impl super::DomainFetcher for SubjectsFetcher {
    fn partition(&self) -> Partition {
        Partition::Subjects
    }

    async fn fetch(&self, scope: &Scope) -> FetchResult<Value> {
        if !matches!(scope, Scope::None) {
            return Err(FetchError::InvalidScope(format!(
                "subjects takes no scope, got {scope:?}"
            )));
        }

        let body = self
            .client
            .get(SUBJECTS_PATH, &[("lang", "cz"), ("format", "json")])
            .await?;
        let subjects = parse_subjects(&body, Utc::now())?;
        serde_json::to_value(&subjects).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

// =============================================================================
// Parsing
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubjectRow {
    full_name: String,
    folder_url: String,
    #[serde(default)]
    subject_id: Option<String>,
    #[serde(default, rename = "skupinaId")]
    group_id: Option<String>,
}

#[derive(Deserialize)]
struct RawSubjectList {
    subjects: Vec<RawSubjectRow>,
}

/// Parses the subjects listing into the per-code map record.
pub(crate) fn parse_subjects(body: &str, now: DateTime<Utc>) -> FetchResult<SubjectsData> {
    let raw: RawSubjectList =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("subjects: {e}")))?;

    let mut data = BTreeMap::new();
    for row in raw.subjects {
        let code = subject_code(&row.full_name);
        if code.is_empty() {
            continue;
        }
        data.insert(
            code.to_string(),
            SubjectInfo {
                display_name: display_name(&row.full_name),
                full_name: row.full_name.clone(),
                name_cs: None,
                name_en: None,
                subject_code: code.to_string(),
                subject_id: row.subject_id,
                group_id: row.group_id,
                folder_url: row.folder_url,
                fetched_at: now,
            },
        );
    }

    Ok(SubjectsData {
        version: SUBJECTS_RECORD_VERSION,
        last_updated: now,
        data,
    })
}

/// The course code is the first whitespace-separated token.
fn subject_code(full_name: &str) -> &str {
    full_name.split_whitespace().next().unwrap_or("")
}

/// Strips the trailing parenthetical, e.g. a faculty or mode marker.
fn display_name(full_name: &str) -> String {
    let trimmed = full_name.trim();
    if trimmed.ends_with(')') {
        if let Some(open) = trimmed.rfind('(') {
            return trimmed[..open].trim_end().to_string();
        }
    }
    trimmed.to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "subjects": [
            {
                "fullName": "EBC-ALG Algoritmizace (PEF)",
                "folderUrl": "/auth/dok_server/slozka.pl?id=1",
                "subjectId": "159410"
            },
            {
                "fullName": "EBC-MT1 Matematika I (PEF)",
                "folderUrl": "/auth/dok_server/slozka.pl?id=2",
                "skupinaId": "77"
            }
        ]
    }"#;

    #[test]
    fn subjects_are_keyed_by_code() {
        let now = Utc::now();
        let subjects = parse_subjects(FIXTURE, now).unwrap();

        assert_eq!(subjects.data.len(), 2);
        let alg = subjects.data.get("EBC-ALG").unwrap();
        assert_eq!(alg.display_name, "EBC-ALG Algoritmizace");
        assert_eq!(alg.subject_id.as_deref(), Some("159410"));
        assert_eq!(alg.fetched_at, now);

        let mt1 = subjects.data.get("EBC-MT1").unwrap();
        assert_eq!(mt1.group_id.as_deref(), Some("77"));
        assert_eq!(mt1.subject_id, None);
    }

    #[test]
    fn display_name_strips_only_trailing_parenthetical() {
        assert_eq!(display_name("EBC-ALG Algoritmizace (PEF)"), "EBC-ALG Algoritmizace");
        assert_eq!(display_name("Fyzika (lab) cviceni"), "Fyzika (lab) cviceni");
        assert_eq!(display_name("Bez zavorky"), "Bez zavorky");
    }

    #[test]
    fn empty_listing_parses_to_empty_map() {
        let subjects = parse_subjects(r#"{"subjects": []}"#, Utc::now()).unwrap();
        assert!(subjects.data.is_empty());
        assert_eq!(subjects.version, SUBJECTS_RECORD_VERSION);
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        let err = parse_subjects("<html>not json</html>", Utc::now()).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
