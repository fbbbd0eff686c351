//! Entity store wrappers — one per backend table.
//!
//! Each store translates the narrow CRUD vocabulary into backend calls and
//! normalizes the result shape for the view layer. Reads go through the
//! query cache; writes go straight to the backend and rely on the change
//! feed to invalidate, so there is a bounded window where a list issued
//! right after a write still shows the pre-write rows.

pub mod appointments;
pub mod budgets;
pub mod doctors;
pub mod exams;
pub mod patients;
pub mod settings;
pub mod transactions;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::backend::{EqFilter, Table, TableBackend};
use crate::cache::{QueryCache, QueryKey};
use crate::error::StoreError;

pub use appointments::AppointmentStore;
pub use budgets::BudgetStore;
pub use doctors::DoctorStore;
pub use exams::ExamStore;
pub use patients::PatientStore;
pub use settings::SettingsStore;
pub use transactions::TransactionStore;

pub(crate) fn from_row<T: DeserializeOwned>(row: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(row)?)
}

pub(crate) fn from_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(from_row).collect()
}

pub(crate) fn to_row<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

/// Cache-first list: serve from the query cache when the key is present,
/// otherwise fetch, populate, and return.
pub(crate) async fn list_rows(
    backend: &Arc<dyn TableBackend>,
    cache: &QueryCache,
    table: Table,
    filter: &EqFilter,
) -> Result<Vec<Value>, StoreError> {
    let key = QueryKey::new(table, filter);
    if let Some(rows) = cache.get(&key) {
        tracing::trace!(table = %table, "list served from cache");
        return Ok(rows);
    }
    let rows = backend.select(table, filter).await?;
    cache.put(key, rows.clone());
    Ok(rows)
}

/// Point read by id, bypassing the cache. Used by cross-entity operations
/// that must see current backend state.
pub(crate) async fn fetch_by_id(
    backend: &Arc<dyn TableBackend>,
    table: Table,
    id: Uuid,
) -> Result<Option<Value>, StoreError> {
    let mut filter = EqFilter::new();
    filter.insert("id".into(), json!(id));
    let mut rows = backend.select(table, &filter).await?;
    Ok(rows.pop())
}
