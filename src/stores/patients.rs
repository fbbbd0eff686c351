use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use super::{fetch_by_id, from_row, from_rows, list_rows, to_row};
use crate::backend::{Table, TableBackend};
use crate::cache::QueryCache;
use crate::error::StoreError;
use crate::models::enums::PersonStatus;
use crate::models::{NewPatient, Patient, PatientFilter, PatientPatch};

pub struct PatientStore {
    backend: Arc<dyn TableBackend>,
    cache: Arc<QueryCache>,
}

impl PatientStore {
    pub fn new(backend: Arc<dyn TableBackend>, cache: Arc<QueryCache>) -> Self {
        Self { backend, cache }
    }

    pub async fn list(&self, filter: &PatientFilter) -> Result<Vec<Patient>, StoreError> {
        let rows = list_rows(&self.backend, &self.cache, Table::Patients, &filter.to_eq()).await?;
        from_rows(rows)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        match fetch_by_id(&self.backend, Table::Patients, id).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    pub async fn create(&self, new: NewPatient) -> Result<Patient, StoreError> {
        if new.name.trim().is_empty() {
            return Err(StoreError::required("name"));
        }
        if new.phone.trim().is_empty() {
            return Err(StoreError::required("phone"));
        }
        let row = self
            .backend
            .insert(Table::Patients, to_row(&new)?)
            .await?;
        let patient: Patient = from_row(row)?;
        tracing::info!(id = %patient.id, name = %patient.name, "patient created");
        Ok(patient)
    }

    pub async fn update(&self, id: Uuid, patch: PatientPatch) -> Result<Patient, StoreError> {
        match self
            .backend
            .update(Table::Patients, id, to_row(&patch)?)
            .await?
        {
            Some(row) => from_row(row),
            None => Err(StoreError::NotFound {
                entity: "patient",
                id,
            }),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.backend.delete(Table::Patients, id).await?)
    }

    /// Soft-delete path: records are retired by flipping status, not by
    /// removing the row.
    pub async fn set_status(&self, id: Uuid, status: PersonStatus) -> Result<Patient, StoreError> {
        self.update(
            id,
            PatientPatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Denormalized visit dates, maintained as a scheduling side effect.
    pub async fn set_next_visit(&self, id: Uuid, date: NaiveDate) -> Result<Patient, StoreError> {
        self.update(
            id,
            PatientPatch {
                next_visit: Some(date),
                ..Default::default()
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;

    pub(crate) fn new_patient(name: &str) -> NewPatient {
        NewPatient {
            name: name.into(),
            phone: "(11) 99999-0000".into(),
            email: None,
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 20),
            cpf: None,
            allergies: None,
            medications: None,
            preferred_doctor: None,
            status: PersonStatus::Active,
        }
    }

    fn store() -> (Arc<MemoryBackend>, PatientStore) {
        let backend = Arc::new(MemoryBackend::new());
        let cache = Arc::new(QueryCache::new());
        (backend.clone(), PatientStore::new(backend, cache))
    }

    #[tokio::test]
    async fn create_then_list_includes_server_assigned_fields() {
        let (_, store) = store();
        let created = store.create(new_patient("Maria Silva")).await.unwrap();
        assert!(!created.id.is_nil());

        let listed = store.list(&PatientFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].created_at, created.created_at);
    }

    #[tokio::test]
    async fn update_status_changes_nothing_else() {
        let (_, store) = store();
        let created = store.create(new_patient("Maria Silva")).await.unwrap();

        let updated = store
            .set_status(created.id, PersonStatus::Inactive)
            .await
            .unwrap();
        assert_eq!(updated.status, PersonStatus::Inactive);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.phone, created.phone);
        assert_eq!(updated.birth_date, created.birth_date);
    }

    #[tokio::test]
    async fn update_missing_id_is_not_found() {
        let (_, store) = store();
        let err = store
            .set_status(Uuid::new_v4(), PersonStatus::Inactive)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "patient", .. }));
    }

    #[tokio::test]
    async fn delete_then_list_excludes_row_and_second_delete_is_false() {
        let (backend, store) = store();
        let created = store.create(new_patient("Maria Silva")).await.unwrap();

        assert!(store.delete(created.id).await.unwrap());
        // Bypass the (now stale) cache to observe backend state directly.
        let remaining = backend
            .select(Table::Patients, &Default::default())
            .await
            .unwrap();
        assert!(remaining.is_empty());
        assert!(!store.delete(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let (_, store) = store();
        let err = store.create(new_patient("   ")).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "name", .. }));
    }

    #[tokio::test]
    async fn status_filter_narrows_list() {
        let (_, store) = store();
        store.create(new_patient("Ana")).await.unwrap();
        let bia = store.create(new_patient("Bia")).await.unwrap();
        store
            .set_status(bia.id, PersonStatus::Inactive)
            .await
            .unwrap();

        let filter = PatientFilter {
            status: Some(PersonStatus::Active),
            ..Default::default()
        };
        let active = store.list(&filter).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Ana");
    }
}
