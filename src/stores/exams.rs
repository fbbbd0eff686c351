use std::sync::Arc;

use uuid::Uuid;

use super::{fetch_by_id, from_row, from_rows, list_rows, to_row};
use crate::backend::{ObjectStorage, Table, TableBackend};
use crate::cache::QueryCache;
use crate::error::StoreError;
use crate::models::enums::ExamStatus;
use crate::models::{Exam, ExamFile, ExamFilter, ExamPatch, NewExam};

pub struct ExamStore {
    backend: Arc<dyn TableBackend>,
    cache: Arc<QueryCache>,
}

impl ExamStore {
    pub fn new(backend: Arc<dyn TableBackend>, cache: Arc<QueryCache>) -> Self {
        Self { backend, cache }
    }

    pub async fn list(&self, filter: &ExamFilter) -> Result<Vec<Exam>, StoreError> {
        let rows = list_rows(&self.backend, &self.cache, Table::Exams, &filter.to_eq()).await?;
        from_rows(rows)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Exam>, StoreError> {
        match fetch_by_id(&self.backend, Table::Exams, id).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    pub async fn create(&self, new: NewExam) -> Result<Exam, StoreError> {
        if new.patient_name.trim().is_empty() {
            return Err(StoreError::required("patient_name"));
        }
        if new.exam_type.trim().is_empty() {
            return Err(StoreError::required("exam_type"));
        }
        let row = self.backend.insert(Table::Exams, to_row(&new)?).await?;
        let exam: Exam = from_row(row)?;
        tracing::info!(id = %exam.id, kind = %exam.exam_type, "exam created");
        Ok(exam)
    }

    pub async fn update(&self, id: Uuid, patch: ExamPatch) -> Result<Exam, StoreError> {
        match self.backend.update(Table::Exams, id, to_row(&patch)?).await? {
            Some(row) => from_row(row),
            None => Err(StoreError::NotFound { entity: "exam", id }),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.backend.delete(Table::Exams, id).await?)
    }

    pub async fn set_status(&self, id: Uuid, status: ExamStatus) -> Result<Exam, StoreError> {
        self.update(
            id,
            ExamPatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Upload a result file and append its metadata to the exam's file list.
    ///
    /// The upload happens first; if the exam row is gone by the time we
    /// patch it, the orphaned object stays in storage and the caller gets
    /// `NotFound`.
    pub async fn attach_file(
        &self,
        id: Uuid,
        name: &str,
        bytes: Vec<u8>,
        storage: &dyn ObjectStorage,
    ) -> Result<Exam, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::required("name"));
        }
        let stored = storage.upload(name, bytes).await?;

        let exam: Exam = match fetch_by_id(&self.backend, Table::Exams, id).await? {
            Some(row) => from_row(row)?,
            None => return Err(StoreError::NotFound { entity: "exam", id }),
        };

        let mut files = exam.files;
        files.push(ExamFile {
            name: stored.name,
            url: stored.url,
            size: stored.size,
        });
        self.update(
            id,
            ExamPatch {
                files: Some(files),
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
    use crate::backend::storage::MemoryStorage;
    use chrono::NaiveDate;

    fn new_exam(patient: &str) -> NewExam {
        NewExam {
            patient_name: patient.into(),
            exam_type: "Hemograma".into(),
            date: NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(),
            status: ExamStatus::Pending,
            observations: None,
            files: Vec::new(),
        }
    }

    fn store() -> ExamStore {
        ExamStore::new(Arc::new(MemoryBackend::new()), Arc::new(QueryCache::new()))
    }

    #[tokio::test]
    async fn attach_file_appends_metadata() {
        let store = store();
        let storage = MemoryStorage::new();
        let exam = store.create(new_exam("Maria Silva")).await.unwrap();

        let updated = store
            .attach_file(exam.id, "hemograma.pdf", vec![0u8; 1024], &storage)
            .await
            .unwrap();
        assert_eq!(updated.files.len(), 1);
        assert_eq!(updated.files[0].name, "hemograma.pdf");
        assert_eq!(updated.files[0].size, 1024);
        assert_eq!(storage.file_count(), 1);

        let again = store
            .attach_file(exam.id, "raio-x.png", vec![0u8; 64], &storage)
            .await
            .unwrap();
        assert_eq!(again.files.len(), 2, "earlier file must be preserved");
    }

    #[tokio::test]
    async fn attach_file_to_missing_exam_is_not_found() {
        let store = store();
        let storage = MemoryStorage::new();
        let err = store
            .attach_file(Uuid::new_v4(), "scan.png", vec![1, 2, 3], &storage)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "exam", .. }));
    }

    #[tokio::test]
    async fn complete_is_a_status_change() {
        let store = store();
        let exam = store.create(new_exam("Maria Silva")).await.unwrap();
        let done = store
            .set_status(exam.id, ExamStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, ExamStatus::Completed);
    }

    #[tokio::test]
    async fn create_requires_exam_type() {
        let store = store();
        let mut new = new_exam("Maria Silva");
        new.exam_type = "  ".into();
        let err = store.create(new).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation { field: "exam_type", .. }
        ));
    }

    #[tokio::test]
    async fn status_filter_narrows_list() {
        let store = store();
        let a = store.create(new_exam("Ana")).await.unwrap();
        store.create(new_exam("Bia")).await.unwrap();
        store.set_status(a.id, ExamStatus::Completed).await.unwrap();

        let filter = ExamFilter {
            status: Some(ExamStatus::Pending),
            ..Default::default()
        };
        let pending = store.list(&filter).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].patient_name, "Bia");
    }
}
