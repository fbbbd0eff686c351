use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

/// A scheduled consultation. `patient_name`/`doctor_name` are snapshots
/// taken at booking time so lists render without joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub doctor_name: String,
    pub date: NaiveDate,
    /// HH:MM, clinic-local.
    pub time: String,
    pub service: String,
    pub service_value: f64,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub doctor_name: String,
    pub date: NaiveDate,
    pub time: String,
    pub service: String,
    pub service_value: f64,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
