use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use super::{fetch_by_id, from_row, from_rows, list_rows, to_row};
use crate::backend::{Table, TableBackend};
use crate::cache::QueryCache;
use crate::error::StoreError;
use crate::models::enums::{AppointmentStatus, TransactionKind, TransactionStatus};
use crate::models::{
    Appointment, AppointmentFilter, AppointmentPatch, NewAppointment, NewTransaction, Transaction,
    TransactionFilter,
};

/// Ledger category for revenue synthesized from scheduling.
pub const CONSULTATION_CATEGORY: &str = "Consultas";

/// Result of [`AppointmentStore::schedule`]: the booked appointment plus the
/// ledger row it synthesized (absent for zero-value services).
#[derive(Debug, Clone)]
pub struct ScheduledAppointment {
    pub appointment: Appointment,
    pub transaction: Option<Transaction>,
}

pub struct AppointmentStore {
    backend: Arc<dyn TableBackend>,
    cache: Arc<QueryCache>,
}

impl AppointmentStore {
    pub fn new(backend: Arc<dyn TableBackend>, cache: Arc<QueryCache>) -> Self {
        Self { backend, cache }
    }

    pub async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let rows = list_rows(
            &self.backend,
            &self.cache,
            Table::Appointments,
            &filter.to_eq(),
        )
        .await?;
        from_rows(rows)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        match fetch_by_id(&self.backend, Table::Appointments, id).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Book an appointment and synthesize its pending revenue transaction.
    ///
    /// The two writes are a saga, not a backend transaction: if the ledger
    /// insert fails, the appointment insert is compensated by a delete and
    /// the error propagates. The patient's denormalized `next_visit` date
    /// is refreshed afterwards, best-effort.
    pub async fn schedule(
        &self,
        new: NewAppointment,
    ) -> Result<ScheduledAppointment, StoreError> {
        if new.service.trim().is_empty() {
            return Err(StoreError::required("service"));
        }
        if new.time.trim().is_empty() {
            return Err(StoreError::required("time"));
        }
        if new.service_value < 0.0 {
            return Err(StoreError::Validation {
                field: "service_value",
                reason: "must not be negative".into(),
            });
        }

        let row = self
            .backend
            .insert(Table::Appointments, to_row(&new)?)
            .await?;
        let appointment: Appointment = from_row(row)?;
        tracing::info!(
            id = %appointment.id,
            patient = %appointment.patient_name,
            date = %appointment.date,
            "appointment scheduled"
        );

        let transaction = if appointment.service_value > 0.0 {
            let ledger_row = NewTransaction {
                kind: TransactionKind::Revenue,
                value: appointment.service_value,
                category: CONSULTATION_CATEGORY.into(),
                description: Some(appointment.service.clone()),
                date: appointment.date,
                status: TransactionStatus::Pending,
                patient_id: Some(appointment.patient_id),
                appointment_id: Some(appointment.id),
            };
            match self
                .backend
                .insert(Table::Transactions, to_row(&ledger_row)?)
                .await
            {
                Ok(row) => Some(from_row::<Transaction>(row)?),
                Err(e) => {
                    tracing::warn!(
                        appointment = %appointment.id,
                        error = %e,
                        "ledger insert failed, compensating appointment"
                    );
                    if let Err(rollback) =
                        self.backend.delete(Table::Appointments, appointment.id).await
                    {
                        tracing::error!(
                            appointment = %appointment.id,
                            error = %rollback,
                            "compensating delete failed, appointment left behind"
                        );
                    }
                    return Err(e.into());
                }
            }
        } else {
            None
        };

        // Denormalized visit date on the patient; a failure here leaves the
        // booking intact.
        if let Err(e) = self
            .backend
            .update(
                Table::Patients,
                appointment.patient_id,
                json!({ "next_visit": appointment.date }),
            )
            .await
        {
            tracing::warn!(patient = %appointment.patient_id, error = %e, "next_visit refresh failed");
        }

        Ok(ScheduledAppointment {
            appointment,
            transaction,
        })
    }

    pub async fn update(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
    ) -> Result<Appointment, StoreError> {
        match self
            .backend
            .update(Table::Appointments, id, to_row(&patch)?)
            .await?
        {
            Some(row) => from_row(row),
            None => Err(StoreError::NotFound {
                entity: "appointment",
                id,
            }),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.backend.delete(Table::Appointments, id).await?)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        self.update(
            id,
            AppointmentPatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Mark the appointment completed and confirm its synthesized ledger
    /// row. Any ledger failure after the status change — including failing
    /// to read the linked rows — rolls the status back so the two never
    /// diverge. The patient's denormalized `last_visit` date is refreshed
    /// afterwards, best-effort.
    pub async fn complete(&self, id: Uuid) -> Result<Appointment, StoreError> {
        let before = self.get(id).await?.ok_or(StoreError::NotFound {
            entity: "appointment",
            id,
        })?;

        let completed = self.set_status(id, AppointmentStatus::Completed).await?;

        let filter = TransactionFilter {
            appointment_id: Some(id),
            ..Default::default()
        };
        let linked = match self
            .backend
            .select(Table::Transactions, &filter.to_eq())
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    appointment = %id,
                    error = %e,
                    "linked ledger lookup failed, reverting appointment status"
                );
                self.set_status(id, before.status).await?;
                return Err(e.into());
            }
        };
        for row in linked {
            let transaction: Transaction = from_row(row)?;
            if transaction.status != TransactionStatus::Pending {
                continue;
            }
            let confirm = self
                .backend
                .update(
                    Table::Transactions,
                    transaction.id,
                    json!({ "status": TransactionStatus::Confirmed }),
                )
                .await;
            if let Err(e) = confirm {
                tracing::warn!(
                    appointment = %id,
                    transaction = %transaction.id,
                    error = %e,
                    "ledger confirm failed, reverting appointment status"
                );
                self.set_status(id, before.status).await?;
                return Err(e.into());
            }
        }

        // Mirror of the next_visit refresh on booking; a failure here
        // leaves the completion intact.
        if let Err(e) = self
            .backend
            .update(
                Table::Patients,
                before.patient_id,
                json!({ "last_visit": before.date }),
            )
            .await
        {
            tracing::warn!(patient = %before.patient_id, error = %e, "last_visit refresh failed");
        }

        Ok(completed)
    }
}
