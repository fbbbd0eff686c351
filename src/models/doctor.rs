use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PersonStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    /// Regional medical-council license number.
    pub crm: String,
    pub specialty: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: PersonStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDoctor {
    pub name: String,
    pub crm: String,
    pub specialty: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: PersonStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PersonStatus>,
}
