use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{TransactionKind, TransactionStatus};

/// A financial ledger row. Append-mostly; updates are used for status
/// changes (pending → confirmed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub value: f64,
    pub category: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub status: TransactionStatus,
    pub patient_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub value: f64,
    pub category: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub status: TransactionStatus,
    pub patient_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
}
