//! Backend seam — the narrow table/changefeed/storage vocabulary the stores
//! consume, with two implementations: [`memory::MemoryBackend`] for tests and
//! offline development, and [`rest::RestBackend`] + [`rest::RealtimeClient`]
//! for the hosted platform.

pub mod memory;
pub mod rest;
pub mod storage;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::BackendError;

pub use storage::{ObjectStorage, StoredFile};

/// Named tables owned by the hosted backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Appointments,
    Patients,
    Doctors,
    Transactions,
    Budgets,
    Exams,
    Settings,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Appointments => "appointments",
            Table::Patients => "patients",
            Table::Doctors => "doctors",
            Table::Transactions => "transactions",
            Table::Budgets => "budgets",
            Table::Exams => "exams",
            Table::Settings => "settings",
        }
    }

    /// Every table.
    pub const ALL: [Table; 7] = [
        Table::Appointments,
        Table::Patients,
        Table::Doctors,
        Table::Transactions,
        Table::Budgets,
        Table::Exams,
        Table::Settings,
    ];

    /// Entity tables the change-feed subscriber watches by default.
    /// Settings is excluded: it is read rarely and saved through its own
    /// store, which refetches on every read.
    pub const TRACKED: [Table; 6] = [
        Table::Appointments,
        Table::Patients,
        Table::Doctors,
        Table::Transactions,
        Table::Budgets,
        Table::Exams,
    ];
}

impl Table {
    /// Inverse of [`Table::as_str`], for names arriving off the wire.
    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality filter: column name → expected JSON value. BTreeMap so the
/// serialized form (the cache fingerprint) is order-stable.
pub type EqFilter = BTreeMap<String, Value>;

/// Kind of row change reported by the backend feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A row-change notification. `row_id` is present when the backend includes
/// the affected primary key in the notification payload.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub table: Table,
    pub op: ChangeOp,
    pub row_id: Option<Uuid>,
}

/// Generic table operations against the hosted backend.
///
/// All writes go straight through; nothing here mutates local state. The
/// backend assigns `id` and `created_at` on insert and returns the persisted
/// row so server-computed defaults are visible to the caller.
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Rows matching the equality filter. Empty vec on no match, never null.
    async fn select(&self, table: Table, filter: &EqFilter) -> Result<Vec<Value>, BackendError>;

    /// Insert a row; returns the persisted row with server-assigned fields.
    async fn insert(&self, table: Table, row: Value) -> Result<Value, BackendError>;

    /// Apply a partial patch. `None` when the id does not exist. Fields not
    /// present in `patch` are left untouched.
    async fn update(
        &self,
        table: Table,
        id: Uuid,
        patch: Value,
    ) -> Result<Option<Value>, BackendError>;

    /// Remove a row. `false` when the id does not exist.
    async fn delete(&self, table: Table, id: Uuid) -> Result<bool, BackendError>;
}

/// Row-change notification source.
///
/// Per-event delivery failures are not observable; consumers only get the
/// boolean connection status. There is no reconnect policy at this layer —
/// on connection loss, events for a table simply stop until re-attach.
pub trait ChangeFeed: Send + Sync {
    /// A fresh receiver for change events on `table`.
    fn changes(&self, table: Table) -> broadcast::Receiver<ChangeEvent>;

    /// Whether the feed believes it is connected.
    fn is_connected(&self) -> bool;
}
