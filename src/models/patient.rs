use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PersonStatus;

/// A clinic patient record. `last_visit`/`next_visit` are denormalized and
/// updated as a side effect of appointment scheduling; `preferred_doctor`
/// is a name snapshot, not an enforced foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub cpf: Option<String>,
    pub allergies: Option<String>,
    pub medications: Option<String>,
    pub preferred_doctor: Option<String>,
    pub status: PersonStatus,
    pub last_visit: Option<NaiveDate>,
    pub next_visit: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Fields the form submits; the backend assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub cpf: Option<String>,
    pub allergies: Option<String>,
    pub medications: Option<String>,
    pub preferred_doctor: Option<String>,
    pub status: PersonStatus,
}

/// Partial patch — only `Some` fields reach the backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medications: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_doctor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PersonStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_visit: Option<NaiveDate>,
}
