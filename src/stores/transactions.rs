use std::sync::Arc;

use uuid::Uuid;

use super::{from_row, from_rows, list_rows, to_row};
use crate::backend::{Table, TableBackend};
use crate::cache::QueryCache;
use crate::error::StoreError;
use crate::models::enums::TransactionStatus;
use crate::models::{NewTransaction, Transaction, TransactionFilter, TransactionPatch};

pub struct TransactionStore {
    backend: Arc<dyn TableBackend>,
    cache: Arc<QueryCache>,
}

impl TransactionStore {
    pub fn new(backend: Arc<dyn TableBackend>, cache: Arc<QueryCache>) -> Self {
        Self { backend, cache }
    }

    pub async fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        let rows = list_rows(
            &self.backend,
            &self.cache,
            Table::Transactions,
            &filter.to_eq(),
        )
        .await?;
        from_rows(rows)
    }

    pub async fn create(&self, new: NewTransaction) -> Result<Transaction, StoreError> {
        if new.category.trim().is_empty() {
            return Err(StoreError::required("category"));
        }
        if new.value <= 0.0 {
            return Err(StoreError::Validation {
                field: "value",
                reason: "must be positive".into(),
            });
        }
        let row = self
            .backend
            .insert(Table::Transactions, to_row(&new)?)
            .await?;
        let transaction: Transaction = from_row(row)?;
        tracing::info!(
            id = %transaction.id,
            kind = transaction.kind.as_str(),
            value = transaction.value,
            "transaction recorded"
        );
        Ok(transaction)
    }

    pub async fn update(
        &self,
        id: Uuid,
        patch: TransactionPatch,
    ) -> Result<Transaction, StoreError> {
        match self
            .backend
            .update(Table::Transactions, id, to_row(&patch)?)
            .await?
        {
            Some(row) => from_row(row),
            None => Err(StoreError::NotFound {
                entity: "transaction",
                id,
            }),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.backend.delete(Table::Transactions, id).await?)
    }

    /// Settle a pending ledger row.
    pub async fn confirm(&self, id: Uuid) -> Result<Transaction, StoreError> {
        self.update(
            id,
            TransactionPatch {
                status: Some(TransactionStatus::Confirmed),
                ..Default::default()
            },
        )
        .await
    }
}
