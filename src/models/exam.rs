use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ExamStatus;

/// Metadata for an uploaded exam file, as returned by object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamFile {
    pub name: String,
    pub url: String,
    pub size: u64,
}

/// An exam record. Linked to a patient by name snapshot only — the source
/// schema never gave exams a patient foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: Uuid,
    pub patient_name: String,
    pub exam_type: String,
    pub date: NaiveDate,
    pub status: ExamStatus,
    pub observations: Option<String>,
    pub files: Vec<ExamFile>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExam {
    pub patient_name: String,
    pub exam_type: String,
    pub date: NaiveDate,
    pub status: ExamStatus,
    pub observations: Option<String>,
    pub files: Vec<ExamFile>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExamPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExamStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<ExamFile>>,
}
