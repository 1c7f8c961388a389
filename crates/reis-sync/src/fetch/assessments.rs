//! Assessments fetcher.
//!
//! Fetches the graded-assessments sheet of one course. The IS localizes
//! numbers, so scores may arrive as `"12,5"` strings; parsing accepts
//! plain numbers, dot decimals, and comma decimals.

use async_trait::async_trait;
use serde_json::Value;

use reis_core::{Assessment, Partition, Scope};

use crate::client::SessionClient;
use crate::error::{FetchError, FetchResult};

const ASSESSMENTS_PATH: &str = "/auth/student/list.pl";

/// Fetches the assessment sheet for one course.
pub struct AssessmentsFetcher {
    client: SessionClient,
}

impl AssessmentsFetcher {
    pub fn new(client: SessionClient) -> Self {
        AssessmentsFetcher { client }
    }
}

#[async_trait]
impl super::DomainFetcher for AssessmentsFetcher {
    fn partition(&self) -> Partition {
        Partition::Assessments
    }

    async fn fetch(&self, scope: &Scope) -> FetchResult<Value> {
        let (study_id, period_id, course_id) = match scope {
            Scope::Course {
                study_id,
                period_id,
                course_id,
            } => (study_id, period_id, course_id),
            other => {
                return Err(FetchError::InvalidScope(format!(
                    "assessments need a course scope, got {other:?}"
                )))
            }
        };

        let body = self
            .client
            .get(
                ASSESSMENTS_PATH,
                &[
                    ("studium", study_id),
                    ("obdobi", period_id),
                    ("predmet", course_id),
                    ("test", "1"),
                    ("lang", "cz"),
                    ("format", "json"),
                ],
            )
            .await?;

        let assessments = parse_assessments(&body)?;
        serde_json::to_value(&assessments).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses the assessment sheet into typed rows.
pub(crate) fn parse_assessments(body: &str) -> FetchResult<Vec<Assessment>> {
    let raw: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("assessments: {e}")))?;

    let rows = raw
        .get("assessments")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse("assessments: missing assessments array".into()))?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let name = string_field(row, "name")?;
        out.push(Assessment {
            score: points(row.get("score"))
                .ok_or_else(|| FetchError::Parse(format!("assessments: bad score in '{name}'")))?,
            max_score: points(row.get("maxScore")).unwrap_or(0.0),
            success_rate: points(row.get("successRate")).unwrap_or(0.0),
            submitted_date: string_field(row, "submittedDate").unwrap_or_default(),
            teacher: string_field(row, "teacher").unwrap_or_default(),
            detail_url: row
                .get("detailUrl")
                .and_then(Value::as_str)
                .map(str::to_string),
            name,
        });
    }
    Ok(out)
}

fn string_field(row: &Value, field: &str) -> FetchResult<String> {
    row.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| FetchError::Parse(format!("assessments: missing '{field}'")))
}

/// Reads a point value that may be a number, a dot-decimal string, or a
/// Czech comma-decimal string.
fn points(value: Option<&Value>) -> Option<f64> {
    let value = value?;
    if let Some(n) = value.as_f64() {
        return Some(n);
    }
    let text = value.as_str()?.trim().replace(',', ".");
    text.parse().ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "assessments": [
            {
                "name": "Prubezny test 1",
                "score": "12,5",
                "maxScore": 20,
                "successRate": "68,4",
                "submittedDate": "22.10.2025",
                "teacher": "Jan Novak",
                "detailUrl": "/auth/student/list.pl?detail=1"
            },
            {
                "name": "Odevzdavarna",
                "score": 8.0,
                "maxScore": "10",
                "successRate": 91.2,
                "submittedDate": "01.11.2025",
                "teacher": "Eva Mala"
            }
        ]
    }"#;

    #[test]
    fn comma_decimals_parse() {
        let rows = parse_assessments(FIXTURE).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].score, 12.5);
        assert_eq!(rows[0].success_rate, 68.4);
        assert_eq!(rows[0].detail_url.as_deref(), Some("/auth/student/list.pl?detail=1"));
        assert_eq!(rows[1].score, 8.0);
        assert_eq!(rows[1].max_score, 10.0);
        assert_eq!(rows[1].detail_url, None);
    }

    #[test]
    fn unparseable_score_is_a_parse_error() {
        let body = r#"{"assessments": [{"name": "Test", "score": "n/a"}]}"#;
        let err = parse_assessments(body).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn missing_array_is_a_parse_error() {
        let err = parse_assessments(r#"{"rows": []}"#).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn empty_sheet_is_fine() {
        let rows = parse_assessments(r#"{"assessments": []}"#).unwrap();
        assert!(rows.is_empty());
    }
}
