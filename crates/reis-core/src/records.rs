//! # Domain Records
//!
//! Typed records for everything the sync engine caches. Field names
//! serialize in camelCase so stored JSON matches the payloads the
//! browser extension historically persisted; the cache survives a
//! migration between the two.
//!
//! ## Record Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Partition        Record                                                │
//! │  ───────────      ───────────────────────────────────────────────────  │
//! │  schedule         ScheduleData { blockLessons: [BlockLesson] }         │
//! │  subjects         SubjectsData { data: { code -> SubjectInfo } }       │
//! │  assessments      Vec<Assessment>  (per course code)                   │
//! │  exams            Vec<ExamSubject>                                     │
//! │  study_program    StudyProgramData { finalTable: [Course] }            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Schedule
// =============================================================================

/// A teacher attached to a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub full_name: String,
    pub short_name: String,
    pub id: String,
}

/// Structured room reference (display name + IS room id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub name: String,
    pub id: String,
}

/// One block of teaching in the timetable.
///
/// The source system reports booleans as the strings `"true"`/`"false"`;
/// fetchers normalize them into real booleans before the record is
/// cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockLesson {
    /// Lesson date as `YYYYMMDD`, e.g. `"20251022"`.
    pub date: String,

    /// Start time `HH:MM`, e.g. `"15:00"`.
    pub start_time: String,

    /// End time `HH:MM`.
    pub end_time: String,

    /// Free-form room label as displayed.
    pub room: String,

    /// Structured room data for linking.
    pub room_structured: Room,

    pub campus: String,
    pub faculty_code: String,

    /// IS identifiers.
    pub id: String,
    pub course_id: String,
    pub study_id: String,
    pub period_id: String,

    pub course_code: String,
    pub course_name: String,

    pub is_seminar: bool,
    pub is_consultation: bool,
    pub is_default_campus: bool,

    /// Present (and true) only for lessons synthesized from exam terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_exam: Option<bool>,

    pub teachers: Vec<Teacher>,
}

/// The schedule partition's record: all lessons of the fetched window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleData {
    pub block_lessons: Vec<BlockLesson>,
}

// =============================================================================
// Subjects
// =============================================================================

/// One enrolled subject with the metadata other fetchers pivot on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectInfo {
    pub display_name: String,
    pub full_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_cs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,

    pub subject_code: String,

    /// Numeric IS subject id (`predmet=...`); required for assessment
    /// and syllabus lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,

    /// Seminar group id, used for classmate lookups.
    #[serde(default, rename = "skupinaId", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// Document folder URL for this subject.
    pub folder_url: String,

    pub fetched_at: DateTime<Utc>,
}

/// The subjects partition's record: one entry per course code.
///
/// BTreeMap keeps serialization order deterministic, which keeps the
/// round-trip tests honest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectsData {
    pub version: u32,
    pub last_updated: DateTime<Utc>,
    pub data: BTreeMap<String, SubjectInfo>,
}

// =============================================================================
// Assessments
// =============================================================================

/// One graded assessment row from a course's assessment sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub name: String,
    pub score: f64,
    pub max_score: f64,

    /// Class-wide success rate for this assessment, 0..=100.
    pub success_rate: f64,

    /// Submission date as displayed by the IS.
    pub submitted_date: String,

    pub teacher: String,

    /// Relative URL to the assessment detail page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_url: Option<String>,
}

// =============================================================================
// Exams
// =============================================================================

/// Seat capacity of an exam term (`"10/20"` in the IS listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamCapacity {
    pub occupied: u32,
    pub total: u32,
    /// Raw capacity text, kept for display fidelity.
    pub raw: String,
}

/// Which attempt an exam term accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttemptType {
    Regular,
    Retake1,
    Retake2,
    Retake3,
}

/// One bookable exam term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamTerm {
    pub id: String,

    /// `DD.MM.YYYY` as displayed.
    pub date: String,

    /// `HH:MM`.
    pub time: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<ExamCapacity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_type: Option<AttemptType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_register_now: Option<bool>,
}

/// The term a student is currently registered for within a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredTerm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    /// `DD.MM.YYYY HH:MM` deadline after which deregistration closes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deregistration_deadline: Option<String>,
}

/// Registration state of an exam section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionStatus {
    /// Student holds a term in this section.
    Registered,
    /// Terms exist and the student may register.
    Available,
    /// Section listed but registration has not opened.
    Open,
}

/// One exam section (e.g. "zkouška") within a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSection {
    pub id: String,
    pub name: String,

    /// Exam type label from the IS.
    #[serde(rename = "type")]
    pub kind: String,

    pub status: SectionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_term: Option<RegisteredTerm>,

    pub terms: Vec<ExamTerm>,
}

/// The exams partition stores one of these per enrolled subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSubject {
    pub version: u32,
    pub id: String,
    pub name: String,
    /// Course code, e.g. `"EBC-ALG"`.
    pub code: String,
    pub sections: Vec<ExamSection>,
}

// =============================================================================
// Study Program
// =============================================================================

/// One row of the study program course table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyProgramCourse {
    pub semester: String,
    pub category: String,
    pub code: String,
    pub name: String,
    pub completion: String,
    pub credits: String,
    pub link: String,
}

/// The study program partition's record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyProgramData {
    pub programs: Vec<String>,
    pub specializations: Vec<String>,
    pub final_table: Vec<StudyProgramCourse>,
    pub last_updated: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_lesson_serializes_camel_case() {
        let lesson = BlockLesson {
            date: "20251022".into(),
            start_time: "15:00".into(),
            end_time: "16:50".into(),
            room: "Q01".into(),
            room_structured: Room {
                name: "Q01".into(),
                id: "123".into(),
            },
            campus: "Brno".into(),
            faculty_code: "PEF".into(),
            id: "1".into(),
            course_id: "159410".into(),
            study_id: "9001".into(),
            period_id: "801".into(),
            course_code: "EBC-ALG".into(),
            course_name: "Algoritmizace".into(),
            is_seminar: false,
            is_consultation: false,
            is_default_campus: true,
            is_exam: None,
            teachers: vec![],
        };

        let json = serde_json::to_value(&lesson).unwrap();
        assert_eq!(json["startTime"], "15:00");
        assert_eq!(json["courseCode"], "EBC-ALG");
        assert_eq!(json["isDefaultCampus"], true);
        // Absent optionals stay off the wire entirely.
        assert!(json.get("isExam").is_none());
    }

    #[test]
    fn subject_group_id_keeps_legacy_wire_name() {
        let info = SubjectInfo {
            display_name: "Algoritmizace".into(),
            full_name: "Algoritmizace (EBC-ALG)".into(),
            name_cs: None,
            name_en: None,
            subject_code: "EBC-ALG".into(),
            subject_id: Some("159410".into()),
            group_id: Some("77".into()),
            folder_url: "/auth/dok_server/slozka.pl?id=1".into(),
            fetched_at: Utc::now(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["skupinaId"], "77");
        assert!(json.get("groupId").is_none());
    }

    #[test]
    fn exam_section_kind_serializes_as_type() {
        let section = ExamSection {
            id: "s1".into(),
            name: "zkouška".into(),
            kind: "zk".into(),
            status: SectionStatus::Available,
            registered_term: None,
            terms: vec![],
        };
        let json = serde_json::to_value(&section).unwrap();
        assert_eq!(json["type"], "zk");
        assert_eq!(json["status"], "available");
    }
}
