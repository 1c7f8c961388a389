//! Schedule fetcher.
//!
//! POSTs to the timetable view endpoint with `format=json` and a date
//! window, then normalizes the response into [`ScheduleData`]. The IS
//! reports lesson flags as the strings `"true"`/`"false"`; parsing
//! coerces them into real booleans before the record is cached.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use reis_core::{Partition, Scope, ScheduleData};

use crate::client::SessionClient;
use crate::config::SessionSettings;
use crate::error::{FetchError, FetchResult};

const SCHEDULE_PATH: &str = "/auth/katalog/rozvrhy_view.pl";

/// Fetches the student timetable for a date window.
pub struct ScheduleFetcher {
    client: SessionClient,
    user_id: String,
    study_id: String,
    period_id: String,
}

impl ScheduleFetcher {
    pub fn new(client: SessionClient, session: &SessionSettings) -> Self {
        ScheduleFetcher {
            client,
            user_id: session.user_id.clone(),
            study_id: session.study_id.clone(),
            period_id: session.period_id.clone(),
        }
    }
}

#[async_trait]
impl super::DomainFetcher for ScheduleFetcher {
    fn partition(&self) -> Partition {
        Partition::Schedule
    }

    async fn fetch(&self, scope: &Scope) -> FetchResult<Value> {
        let (start, end) = match scope {
            Scope::DateRange { start, end } => (*start, *end),
            other => {
                return Err(FetchError::InvalidScope(format!(
                    "schedule needs a date range, got {other:?}"
                )))
            }
        };

        let from = is_date(start);
        let to = is_date(end);
        debug!(%from, %to, "Fetching schedule window");

        let back = format!(
            "../student/moje_studium.pl?_m=3110,studium={},obdobi={}",
            self.study_id, self.period_id
        );
        let form: Vec<(&str, &str)> = vec![
            ("rozvrh_student", &self.user_id),
            ("zpet", &back),
            ("rezervace", "0"),
            ("poznamky_base", "1"),
            ("poznamky_parovani", "1"),
            ("poznamky_jiny_areal", "1"),
            ("poznamky_dl_omez", "1"),
            ("typ_vypisu", "konani"),
            ("konani_od", &from),
            ("konani_do", &to),
            ("format", "json"),
            ("nezvol_all", "2"),
            ("poznamky", "1"),
            ("poznamky_zmeny", "1"),
            ("poznamky_dalsi_ucit", "1"),
            ("zobraz", "1"),
            ("zobraz2", "Zobrazit"),
        ];

        let body = self.client.post_form(SCHEDULE_PATH, &form).await?;
        let schedule = parse_schedule(&body)?;
        serde_json::to_value(&schedule).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

/// Formats a date the way the IS form fields expect (`DD.MM.YYYY`).
pub(crate) fn is_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Parses the timetable JSON response into a typed record.
pub(crate) fn parse_schedule(body: &str) -> FetchResult<ScheduleData> {
    let mut raw: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("schedule: {e}")))?;

    let lessons = raw
        .get_mut("blockLessons")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| FetchError::Parse("schedule: missing blockLessons array".into()))?;

    for lesson in lessons.iter_mut() {
        for flag in ["isSeminar", "isConsultation", "isDefaultCampus", "isExam"] {
            if let Some(field) = lesson.get_mut(flag) {
                coerce_bool(field);
            }
        }
    }

    serde_json::from_value(raw).map_err(|e| FetchError::Parse(format!("schedule: {e}")))
}

/// Rewrites `"true"`/`"false"`/`"1"`/`"0"` strings into JSON booleans.
fn coerce_bool(field: &mut Value) {
    if let Some(text) = field.as_str() {
        let flag = matches!(text.trim(), "true" | "True" | "1");
        *field = Value::Bool(flag);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
