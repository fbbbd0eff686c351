use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Clinic-wide settings: profile fields plus the monthly revenue goal the
/// dashboard measures progress against. Single-row semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSettings {
    pub id: Uuid,
    pub clinic_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub monthly_goal: f64,
    pub created_at: DateTime<Utc>,
}

/// Values submitted from the settings form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub clinic_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub monthly_goal: f64,
}

impl Default for SettingsUpdate {
    fn default() -> Self {
        Self {
            clinic_name: String::new(),
            phone: None,
            email: None,
            monthly_goal: 0.0,
        }
    }
}
