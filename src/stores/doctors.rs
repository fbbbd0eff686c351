use std::sync::Arc;

use uuid::Uuid;

use super::{fetch_by_id, from_row, from_rows, list_rows, to_row};
use crate::backend::{Table, TableBackend};
use crate::cache::QueryCache;
use crate::error::StoreError;
use crate::models::enums::PersonStatus;
use crate::models::{Doctor, DoctorFilter, DoctorPatch, NewDoctor};

pub struct DoctorStore {
    backend: Arc<dyn TableBackend>,
    cache: Arc<QueryCache>,
}

impl DoctorStore {
    pub fn new(backend: Arc<dyn TableBackend>, cache: Arc<QueryCache>) -> Self {
        Self { backend, cache }
    }

    pub async fn list(&self, filter: &DoctorFilter) -> Result<Vec<Doctor>, StoreError> {
        let rows = list_rows(&self.backend, &self.cache, Table::Doctors, &filter.to_eq()).await?;
        from_rows(rows)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Doctor>, StoreError> {
        match fetch_by_id(&self.backend, Table::Doctors, id).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    pub async fn create(&self, new: NewDoctor) -> Result<Doctor, StoreError> {
        if new.name.trim().is_empty() {
            return Err(StoreError::required("name"));
        }
        if new.crm.trim().is_empty() {
            return Err(StoreError::required("crm"));
        }
        if new.specialty.trim().is_empty() {
            return Err(StoreError::required("specialty"));
        }
        let row = self.backend.insert(Table::Doctors, to_row(&new)?).await?;
        let doctor: Doctor = from_row(row)?;
        tracing::info!(id = %doctor.id, name = %doctor.name, "doctor created");
        Ok(doctor)
    }

    pub async fn update(&self, id: Uuid, patch: DoctorPatch) -> Result<Doctor, StoreError> {
        match self
            .backend
            .update(Table::Doctors, id, to_row(&patch)?)
            .await?
        {
            Some(row) => from_row(row),
            None => Err(StoreError::NotFound {
                entity: "doctor",
                id,
            }),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.backend.delete(Table::Doctors, id).await?)
    }

    pub async fn set_status(&self, id: Uuid, status: PersonStatus) -> Result<Doctor, StoreError> {
        self.update(
            id,
            DoctorPatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }
}
