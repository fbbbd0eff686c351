//! In-process backend with the same contract as the hosted platform:
//! server-assigned ids and timestamps, equality selects, partial patches,
//! and a broadcast change feed that fires after every committed write.
//!
//! Serves the test suite and offline development. Not a persistence layer —
//! contents vanish with the process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{ChangeEvent, ChangeFeed, ChangeOp, EqFilter, Table, TableBackend};
use crate::error::BackendError;

/// Broadcast buffer per table; invalidation is coarse, so lagging receivers
/// only cost extra invalidations, never missed rows.
const FEED_CAPACITY: usize = 64;

pub struct MemoryBackend {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    feeds: HashMap<Table, broadcast::Sender<ChangeEvent>>,
    connected: AtomicBool,
    selects_served: AtomicU64,
    #[cfg(test)]
    fail_next_insert: Mutex<Option<Table>>,
    #[cfg(test)]
    fail_next_select: Mutex<Option<Table>>,
    #[cfg(test)]
    fail_update: Mutex<Option<(Table, u32)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let mut feeds = HashMap::new();
        for table in Table::ALL {
            let (tx, _) = broadcast::channel(FEED_CAPACITY);
            feeds.insert(table, tx);
        }
        Self {
            tables: Mutex::new(HashMap::new()),
            feeds,
            connected: AtomicBool::new(true),
            selects_served: AtomicU64::new(0),
            #[cfg(test)]
            fail_next_insert: Mutex::new(None),
            #[cfg(test)]
            fail_next_select: Mutex::new(None),
            #[cfg(test)]
            fail_update: Mutex::new(None),
        }
    }

    /// Locks never hold user code, so a poisoned mutex only means a panic
    /// mid-write elsewhere; the map itself is still coherent. Recover
    /// instead of cascading the panic.
    fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of selects that reached this backend (as opposed to being
    /// answered from the query cache).
    pub fn selects_served(&self) -> u64 {
        self.selects_served.load(Ordering::Relaxed)
    }

    /// Simulate connection loss/recovery of the change feed.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Fault injection: the next insert into `table` fails with a
    /// constraint violation.
    #[cfg(test)]
    pub fn fail_next_insert(&self, table: Table) {
        *Self::lock(&self.fail_next_insert) = Some(table);
    }

    /// Fault injection: the next select on `table` fails.
    #[cfg(test)]
    pub fn fail_next_select(&self, table: Table) {
        *Self::lock(&self.fail_next_select) = Some(table);
    }

    /// Fault injection: the update on `table` fails after `skip` further
    /// successful updates on it. `skip = 0` fails the very next one.
    #[cfg(test)]
    pub fn fail_update_after(&self, table: Table, skip: u32) {
        *Self::lock(&self.fail_update) = Some((table, skip));
    }

    fn emit(&self, table: Table, op: ChangeOp, row_id: Option<Uuid>) {
        if !self.connected.load(Ordering::Relaxed) {
            return;
        }
        // send() errs only when nobody is subscribed — not a failure here.
        let _ = self.feeds[&table].send(ChangeEvent { table, op, row_id });
    }

    fn row_id(row: &Value) -> Option<Uuid> {
        row.get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    fn matches(row: &Value, filter: &EqFilter) -> bool {
        filter
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TableBackend for MemoryBackend {
    async fn select(&self, table: Table, filter: &EqFilter) -> Result<Vec<Value>, BackendError> {
        self.selects_served.fetch_add(1, Ordering::Relaxed);
        #[cfg(test)]
        {
            let mut fail = Self::lock(&self.fail_next_select);
            if *fail == Some(table) {
                *fail = None;
                return Err(BackendError::Status {
                    code: 503,
                    message: format!("injected failure on {table}"),
                });
            }
        }
        let tables = Self::lock(&self.tables);
        let rows = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| Self::matches(row, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, BackendError> {
        #[cfg(test)]
        {
            let mut fail = Self::lock(&self.fail_next_insert);
            if *fail == Some(table) {
                *fail = None;
                return Err(BackendError::Constraint(format!(
                    "injected failure on {table}"
                )));
            }
        }

        let mut row = match row {
            Value::Object(map) => map,
            other => {
                return Err(BackendError::Constraint(format!(
                    "row must be a JSON object, got {other}"
                )))
            }
        };
        let id = Uuid::new_v4();
        row.insert("id".into(), json!(id));
        row.insert("created_at".into(), json!(Utc::now()));
        let row = Value::Object(row);

        Self::lock(&self.tables)
            .entry(table)
            .or_default()
            .push(row.clone());
        self.emit(table, ChangeOp::Insert, Some(id));
        Ok(row)
    }

    async fn update(
        &self,
        table: Table,
        id: Uuid,
        patch: Value,
    ) -> Result<Option<Value>, BackendError> {
        let patch = match patch {
            Value::Object(map) => map,
            other => {
                return Err(BackendError::Constraint(format!(
                    "patch must be a JSON object, got {other}"
                )))
            }
        };

        #[cfg(test)]
        {
            let mut fail = Self::lock(&self.fail_update);
            if let Some((t, skip)) = fail.as_mut() {
                if *t == table {
                    if *skip == 0 {
                        *fail = None;
                        return Err(BackendError::Status {
                            code: 503,
                            message: format!("injected failure on {table}"),
                        });
                    }
                    *skip -= 1;
                }
            }
        }

        let updated = {
            let mut tables = Self::lock(&self.tables);
            let rows = match tables.get_mut(&table) {
                Some(rows) => rows,
                None => return Ok(None),
            };
            let row = rows.iter_mut().find(|row| Self::row_id(row) == Some(id));
            match row {
                Some(row) => {
                    let object = row
                        .as_object_mut()
                        .ok_or_else(|| BackendError::Constraint("stored row corrupt".into()))?;
                    for (column, value) in patch {
                        object.insert(column, value);
                    }
                    Some(row.clone())
                }
                None => None,
            }
        };

        if updated.is_some() {
            self.emit(table, ChangeOp::Update, Some(id));
        }
        Ok(updated)
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<bool, BackendError> {
        let removed = {
            let mut tables = Self::lock(&self.tables);
            match tables.get_mut(&table) {
                Some(rows) => {
                    let before = rows.len();
                    rows.retain(|row| Self::row_id(row) != Some(id));
                    rows.len() < before
                }
                None => false,
            }
        };

        if removed {
            self.emit(table, ChangeOp::Delete, Some(id));
        }
        Ok(removed)
    }
}

impl ChangeFeed for MemoryBackend {
    fn changes(&self, table: Table) -> broadcast::Receiver<ChangeEvent> {
        self.feeds[&table].subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(column: &str, value: Value) -> EqFilter {
        let mut f = EqFilter::new();
        f.insert(column.into(), value);
        f
    }

    #[tokio::test]
    async fn insert_assigns_id_and_created_at() {
        let backend = MemoryBackend::new();
        let row = backend
            .insert(Table::Patients, json!({"name": "Ana"}))
            .await
            .unwrap();
        assert!(row.get("id").unwrap().as_str().is_some());
        assert!(row.get("created_at").unwrap().as_str().is_some());
        assert_eq!(row.get("name").unwrap(), "Ana");
    }

    #[tokio::test]
    async fn select_applies_equality_filter() {
        let backend = MemoryBackend::new();
        backend
            .insert(Table::Patients, json!({"name": "Ana", "status": "active"}))
            .await
            .unwrap();
        backend
            .insert(Table::Patients, json!({"name": "Bia", "status": "inactive"}))
            .await
            .unwrap();

        let active = backend
            .select(Table::Patients, &eq("status", json!("active")))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].get("name").unwrap(), "Ana");

        let all = backend
            .select(Table::Patients, &EqFilter::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn update_patches_only_named_fields() {
        let backend = MemoryBackend::new();
        let row = backend
            .insert(Table::Doctors, json!({"name": "Dr. Lima", "status": "active"}))
            .await
            .unwrap();
        let id = MemoryBackend::row_id(&row).unwrap();

        let updated = backend
            .update(Table::Doctors, id, json!({"status": "inactive"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.get("status").unwrap(), "inactive");
        assert_eq!(updated.get("name").unwrap(), "Dr. Lima");
    }

    #[tokio::test]
    async fn update_missing_id_returns_none() {
        let backend = MemoryBackend::new();
        let missing = backend
            .update(Table::Doctors, Uuid::new_v4(), json!({"status": "inactive"}))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_twice_reports_false() {
        let backend = MemoryBackend::new();
        let row = backend
            .insert(Table::Exams, json!({"exam_type": "Hemograma"}))
            .await
            .unwrap();
        let id = MemoryBackend::row_id(&row).unwrap();

        assert!(backend.delete(Table::Exams, id).await.unwrap());
        assert!(!backend.delete(Table::Exams, id).await.unwrap());
    }

    #[tokio::test]
    async fn writes_emit_change_events() {
        let backend = MemoryBackend::new();
        let mut rx = backend.changes(Table::Patients);

        let row = backend
            .insert(Table::Patients, json!({"name": "Ana"}))
            .await
            .unwrap();
        let id = MemoryBackend::row_id(&row).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.table, Table::Patients);
        assert_eq!(event.op, ChangeOp::Insert);
        assert_eq!(event.row_id, Some(id));

        backend.delete(Table::Patients, id).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.op, ChangeOp::Delete);
    }

    #[tokio::test]
    async fn disconnected_feed_stops_emitting() {
        let backend = MemoryBackend::new();
        let mut rx = backend.changes(Table::Patients);

        backend.set_connected(false);
        assert!(!backend.is_connected());
        backend
            .insert(Table::Patients, json!({"name": "Ana"}))
            .await
            .unwrap();
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn injected_update_fault_respects_skip_count() {
        let backend = MemoryBackend::new();
        let row = backend
            .insert(Table::Budgets, json!({"status": "pending"}))
            .await
            .unwrap();
        let id = MemoryBackend::row_id(&row).unwrap();

        backend.fail_update_after(Table::Budgets, 1);
        backend
            .update(Table::Budgets, id, json!({"status": "paid"}))
            .await
            .unwrap();
        assert!(backend
            .update(Table::Budgets, id, json!({"status": "overdue"}))
            .await
            .is_err());
        // One-shot: cleared once it fires.
        backend
            .update(Table::Budgets, id, json!({"status": "pending"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn select_counter_tracks_backend_hits() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.selects_served(), 0);
        backend
            .select(Table::Budgets, &EqFilter::new())
            .await
            .unwrap();
        backend
            .select(Table::Budgets, &EqFilter::new())
            .await
            .unwrap();
        assert_eq!(backend.selects_served(), 2);
    }
}
