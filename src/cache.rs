//! Query cache — read results keyed by logical query identity.
//!
//! A key is (table, fingerprint of the equality filter). Invalidation is
//! imperative and idempotent: invalidating twice, or out of order, lands in
//! the same end state, which is why the change-feed subscriber needs no
//! locking beyond the map mutex here.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use uuid::Uuid;

use crate::backend::{EqFilter, Table};

/// Logical identity of a cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    table: Table,
    fingerprint: String,
}

impl QueryKey {
    pub fn new(table: Table, filter: &EqFilter) -> Self {
        // BTreeMap iterates in key order, so equal filters always produce
        // equal fingerprints.
        let fingerprint = serde_json::to_string(filter).unwrap_or_default();
        Self { table, fingerprint }
    }

    pub fn table(&self) -> Table {
        self.table
    }
}

#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Vec<Value>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A poisoned lock only means some thread panicked while holding it;
    /// cache entries are droppable data, so recover rather than propagate
    /// the panic.
    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Vec<Value>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &QueryKey) -> Option<Vec<Value>> {
        self.entries().get(key).cloned()
    }

    pub fn put(&self, key: QueryKey, rows: Vec<Value>) {
        self.entries().insert(key, rows);
    }

    /// Drop every entry in the table's namespace. Returns how many entries
    /// were removed. This is the coarse path the subscriber takes on any
    /// change event.
    pub fn invalidate_table(&self, table: Table) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| key.table != table);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(table = %table, removed, "cache namespace invalidated");
        }
        removed
    }

    /// Drop only the entries in the namespace whose cached rows contain
    /// `id`. Sound for update/delete events; insert events need the coarse
    /// path since a new row can match any filter.
    pub fn invalidate_row(&self, table: Table, id: Uuid) -> usize {
        let id_json = Value::String(id.to_string());
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, rows| {
            key.table != table || !rows.iter().any(|row| row.get("id") == Some(&id_json))
        });
        before - entries.len()
    }

    /// Drop everything, across all tables. Returns how many entries were
    /// removed. Recovery hatch for after a feed reconnect.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries();
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eq(column: &str, value: &str) -> EqFilter {
        let mut f = EqFilter::new();
        f.insert(column.into(), json!(value));
        f
    }

    #[test]
    fn put_then_get_roundtrips() {
        let cache = QueryCache::new();
        let key = QueryKey::new(Table::Patients, &EqFilter::new());
        cache.put(key.clone(), vec![json!({"name": "Ana"})]);
        assert_eq!(cache.get(&key).unwrap().len(), 1);
    }

    #[test]
    fn different_filters_are_distinct_keys() {
        let active = QueryKey::new(Table::Patients, &eq("status", "active"));
        let inactive = QueryKey::new(Table::Patients, &eq("status", "inactive"));
        assert_ne!(active, inactive);

        let cache = QueryCache::new();
        cache.put(active.clone(), vec![]);
        assert!(cache.get(&inactive).is_none());
    }

    #[test]
    fn invalidate_table_is_scoped_to_namespace() {
        let cache = QueryCache::new();
        cache.put(QueryKey::new(Table::Patients, &EqFilter::new()), vec![]);
        cache.put(
            QueryKey::new(Table::Patients, &eq("status", "active")),
            vec![],
        );
        cache.put(QueryKey::new(Table::Doctors, &EqFilter::new()), vec![]);

        assert_eq!(cache.invalidate_table(Table::Patients), 2);
        assert_eq!(cache.len(), 1);
        // Idempotent: nothing left to remove.
        assert_eq!(cache.invalidate_table(Table::Patients), 0);
    }

    #[test]
    fn invalidate_row_keeps_unrelated_entries() {
        let cache = QueryCache::new();
        let id = Uuid::new_v4();
        cache.put(
            QueryKey::new(Table::Patients, &EqFilter::new()),
            vec![json!({"id": id.to_string(), "name": "Ana"})],
        );
        cache.put(
            QueryKey::new(Table::Patients, &eq("status", "inactive")),
            vec![json!({"id": Uuid::new_v4().to_string()})],
        );

        assert_eq!(cache.invalidate_row(Table::Patients, id), 1);
        assert_eq!(cache.len(), 1);
    }
}
