use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

use super::{fetch_by_id, from_row, from_rows, list_rows, to_row};
use crate::backend::{Table, TableBackend};
use crate::cache::QueryCache;
use crate::error::StoreError;
use crate::models::enums::{BudgetStatus, TransactionKind, TransactionStatus};
use crate::models::{Budget, BudgetFilter, BudgetPatch, NewBudget, NewTransaction, Transaction};

/// Ledger category for budget settlements.
pub const BUDGET_CATEGORY: &str = "Orçamentos";

pub struct BudgetStore {
    backend: Arc<dyn TableBackend>,
    cache: Arc<QueryCache>,
}

impl BudgetStore {
    pub fn new(backend: Arc<dyn TableBackend>, cache: Arc<QueryCache>) -> Self {
        Self { backend, cache }
    }

    pub async fn list(&self, filter: &BudgetFilter) -> Result<Vec<Budget>, StoreError> {
        let rows = list_rows(&self.backend, &self.cache, Table::Budgets, &filter.to_eq()).await?;
        from_rows(rows)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Budget>, StoreError> {
        match fetch_by_id(&self.backend, Table::Budgets, id).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    pub async fn create(&self, new: NewBudget) -> Result<Budget, StoreError> {
        if new.patient_name.trim().is_empty() {
            return Err(StoreError::required("patient_name"));
        }
        if new.items.is_empty() {
            return Err(StoreError::Validation {
                field: "items",
                reason: "at least one procedure".into(),
            });
        }
        if new.total_value <= 0.0 {
            return Err(StoreError::Validation {
                field: "total_value",
                reason: "must be positive".into(),
            });
        }
        let row = self.backend.insert(Table::Budgets, to_row(&new)?).await?;
        let budget: Budget = from_row(row)?;
        tracing::info!(id = %budget.id, patient = %budget.patient_name, total = budget.total_value, "budget created");
        Ok(budget)
    }

    pub async fn update(&self, id: Uuid, patch: BudgetPatch) -> Result<Budget, StoreError> {
        match self
            .backend
            .update(Table::Budgets, id, to_row(&patch)?)
            .await?
        {
            Some(row) => from_row(row),
            None => Err(StoreError::NotFound {
                entity: "budget",
                id,
            }),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.backend.delete(Table::Budgets, id).await?)
    }

    /// Mark a budget paid and settle its ledger side in one saga.
    ///
    /// If the budget already links a transaction, that row is confirmed;
    /// otherwise a confirmed revenue row is created and linked. Either way
    /// a ledger failure rolls the status change back, so a paid budget
    /// always has a confirmed transaction behind it.
    pub async fn mark_paid(&self, id: Uuid) -> Result<Budget, StoreError> {
        let before: Budget = match fetch_by_id(&self.backend, Table::Budgets, id).await? {
            Some(row) => from_row(row)?,
            None => {
                return Err(StoreError::NotFound {
                    entity: "budget",
                    id,
                })
            }
        };
        if before.status == BudgetStatus::Paid {
            return Ok(before);
        }

        let paid = self
            .update(
                id,
                BudgetPatch {
                    status: Some(BudgetStatus::Paid),
                    ..Default::default()
                },
            )
            .await?;

        let settled = match before.transaction_id {
            Some(tx_id) => self
                .backend
                .update(
                    Table::Transactions,
                    tx_id,
                    json!({ "status": TransactionStatus::Confirmed }),
                )
                .await
                .map_err(StoreError::from)
                .and_then(|row| {
                    row.map(|_| paid.clone()).ok_or(StoreError::NotFound {
                        entity: "transaction",
                        id: tx_id,
                    })
                }),
            None => self.settle_unlinked(id, &before).await,
        };

        match settled {
            Ok(budget) => {
                tracing::info!(id = %budget.id, "budget paid");
                Ok(budget)
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "ledger settlement failed, reverting budget status");
                if let Err(rollback) = self
                    .backend
                    .update(Table::Budgets, id, json!({ "status": before.status }))
                    .await
                {
                    tracing::error!(id = %id, error = %rollback, "budget status rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Create the confirmed revenue row for a budget with no prior ledger
    /// link, then write the link back onto the budget. If the link update
    /// fails the inserted transaction is deleted again — otherwise an
    /// unlinked confirmed row would inflate the ledger.
    async fn settle_unlinked(&self, id: Uuid, before: &Budget) -> Result<Budget, StoreError> {
        let ledger_row = NewTransaction {
            kind: TransactionKind::Revenue,
            value: before.total_value,
            category: BUDGET_CATEGORY.into(),
            description: Some(format!("Orçamento {}", before.patient_name)),
            date: before.due_date,
            status: TransactionStatus::Confirmed,
            patient_id: Some(before.patient_id),
            appointment_id: None,
        };
        let row = self
            .backend
            .insert(Table::Transactions, to_row(&ledger_row)?)
            .await?;
        let transaction: Transaction = from_row(row)?;

        match self
            .update(
                id,
                BudgetPatch {
                    transaction_id: Some(transaction.id),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(budget) => Ok(budget),
            Err(e) => {
                tracing::warn!(
                    budget = %id,
                    transaction = %transaction.id,
                    error = %e,
                    "link update failed, compensating ledger insert"
                );
                if let Err(rollback) = self
                    .backend
                    .delete(Table::Transactions, transaction.id)
                    .await
                {
                    tracing::error!(
                        transaction = %transaction.id,
                        error = %rollback,
                        "compensating delete failed, ledger row left behind"
                    );
                }
                Err(e)
            }
        }
    }

    /// Sweep pending budgets whose due date has passed. Returns how many
    /// were flipped to overdue.
    pub async fn mark_overdue(&self, today: NaiveDate) -> Result<usize, StoreError> {
        let mut filter = crate::backend::EqFilter::new();
        filter.insert("status".into(), json!(BudgetStatus::Pending.as_str()));
        let pending = self.backend.select(Table::Budgets, &filter).await?;

        let mut flipped = 0;
        for row in pending {
            let budget: Budget = from_row(row)?;
            if budget.due_date < today {
                self.backend
                    .update(
                        Table::Budgets,
                        budget.id,
                        json!({ "status": BudgetStatus::Overdue }),
                    )
                    .await?;
                flipped += 1;
            }
        }
        if flipped > 0 {
            tracing::info!(count = flipped, "budgets marked overdue");
        }
        Ok(flipped)
    }
}
