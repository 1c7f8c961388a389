//! Exams fetcher.
//!
//! Fetches the exam-term listing for the active study. Two quirks of
//! the listing are normalized here:
//!
//! - term capacity arrives as the display string `"10/20"`; parsing
//!   splits it into occupied/total and derives the `full` flag,
//! - dates arrive as `"16.2.2026 10:00 (po)"` with unpadded components
//!   and a trailing weekday; parsing pads to `DD.MM.YYYY` and drops the
//!   weekday.

use async_trait::async_trait;
use serde_json::Value;

use reis_core::{ExamCapacity, ExamSubject, Partition, Scope};

use crate::client::SessionClient;
use crate::config::SessionSettings;
use crate::error::{FetchError, FetchResult};

const EXAMS_PATH: &str = "/auth/student/terminy_seznam.pl";

/// Fetches the exam-term listing.
pub struct ExamsFetcher {
    client: SessionClient,
    study_id: String,
}

impl ExamsFetcher {
    pub fn new(client: SessionClient, session: &SessionSettings) -> Self {
        ExamsFetcher {
            client,
            study_id: session.study_id.clone(),
        }
    }
}

#[async_trait]
impl super::DomainFetcher for ExamsFetcher {
    fn partition(&self) -> Partition {
        Partition::Exams
    }

    async fn fetch(&self, scope: &Scope) -> FetchResult<Value> {
        // The default scope uses the configured study; a Study scope
        // overrides it (e.g. a second concurrent study).
        let study_id = match scope {
            Scope::None => self.study_id.as_str(),
            Scope::Study { study_id, .. } => study_id.as_str(),
            other => {
                return Err(FetchError::InvalidScope(format!(
                    "exams take no scope or a study scope, got {other:?}"
                )))
            }
        };

        let body = self
            .client
            .get(
                EXAMS_PATH,
                &[("studium", study_id), ("lang", "cz"), ("format", "json")],
            )
            .await?;

        let subjects = parse_exams(&body)?;
        serde_json::to_value(&subjects).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses the exam listing into one record per subject.
pub(crate) fn parse_exams(body: &str) -> FetchResult<Vec<ExamSubject>> {
    let mut raw: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("exams: {e}")))?;

    let mut subjects = match raw.get_mut("subjects") {
        Some(subjects) if subjects.is_array() => subjects.take(),
        _ => return Err(FetchError::Parse("exams: missing subjects array".into())),
    };

    for subject in subjects.as_array_mut().into_iter().flatten() {
        let Some(sections) = subject.get_mut("sections").and_then(Value::as_array_mut) else {
            continue;
        };
        for section in sections.iter_mut() {
            if let Some(registered) = section.get_mut("registeredTerm") {
                normalize_date_field(registered, "date");
            }
            let Some(terms) = section.get_mut("terms").and_then(Value::as_array_mut) else {
                continue;
            };
            for term in terms.iter_mut() {
                normalize_date_field(term, "date");
                normalize_capacity(term);
            }
        }
    }

    serde_json::from_value(subjects).map_err(|e| FetchError::Parse(format!("exams: {e}")))
}

/// Replaces a string `capacity` with the structured form and fills in
/// `full` when absent.
fn normalize_capacity(term: &mut Value) {
    let Some(raw) = term.get("capacity").and_then(Value::as_str) else {
        return;
    };
    let Some(capacity) = parse_capacity(raw) else {
        // Unparseable capacity text is dropped rather than failing the
        // whole listing; the term stays bookable in the UI.
        if let Some(object) = term.as_object_mut() {
            object.remove("capacity");
        }
        return;
    };

    let full = capacity.occupied >= capacity.total;
    if let Some(object) = term.as_object_mut() {
        if let Ok(value) = serde_json::to_value(&capacity) {
            object.insert("capacity".into(), value);
        }
        object
            .entry("full")
            .or_insert_with(|| Value::Bool(full));
    }
}

/// Splits the `"10/20"` display capacity.
fn parse_capacity(raw: &str) -> Option<ExamCapacity> {
    let (occupied, total) = raw.trim().split_once('/')?;
    Some(ExamCapacity {
        occupied: occupied.trim().parse().ok()?,
        total: total.trim().parse().ok()?,
        raw: raw.trim().to_string(),
    })
}

fn normalize_date_field(object: &mut Value, field: &str) {
    if let Some(raw) = object.get(field).and_then(Value::as_str) {
        let normalized = normalize_date(raw);
        if let Some(object) = object.as_object_mut() {
            object.insert(field.to_string(), Value::String(normalized));
        }
    }
}

/// Pads `D.M.YYYY [HH:MM [(weekday)]]` to `DD.MM.YYYY [HH:MM]`.
///
/// Anything that does not look like a dotted date passes through
/// unchanged (the IS uses `--` for unscheduled terms).
pub(crate) fn normalize_date(raw: &str) -> String {
    let mut parts = raw.split_whitespace();
    let Some(main) = parts.next() else {
        return raw.to_string();
    };
    let time = parts.next().unwrap_or("");

    let pieces: Vec<&str> = main.split('.').collect();
    let [day, month, year] = pieces.as_slice() else {
        return raw.to_string();
    };
    if year.is_empty() {
        return raw.to_string();
    }

    let date = format!("{:0>2}.{:0>2}.{year}", day, month);
    if time.is_empty() {
        date
    } else {
        format!("{date} {time}")
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
