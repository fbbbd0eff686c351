use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{BudgetStatus, PaymentMethod};

/// One procedure line inside a budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetItem {
    pub description: String,
    pub value: f64,
}

/// A quote handed to a patient. Backend-persisted only; when marked paid
/// the linked revenue transaction is confirmed in the same operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub items: Vec<BudgetItem>,
    pub total_value: f64,
    pub payment_method: PaymentMethod,
    pub status: BudgetStatus,
    pub due_date: NaiveDate,
    /// Ledger row settled when this budget is paid.
    pub transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBudget {
    pub patient_id: Uuid,
    pub patient_name: String,
    pub items: Vec<BudgetItem>,
    pub total_value: f64,
    pub payment_method: PaymentMethod,
    pub status: BudgetStatus,
    pub due_date: NaiveDate,
    pub transaction_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BudgetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<BudgetItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BudgetStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
}
