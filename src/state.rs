//! Application data facade.
//!
//! [`ClinicData`] wires every store to one backend and one query cache,
//! and holds the change-feed subscription that keeps the cache honest.
//! The view layer owns a single instance for the life of the window.

use std::sync::Arc;

use crate::backend::{ChangeFeed, Table, TableBackend};
use crate::cache::QueryCache;
use crate::realtime::{FeedSubscriber, SubscriptionGuard};
use crate::stores::{
    AppointmentStore, BudgetStore, DoctorStore, ExamStore, PatientStore, SettingsStore,
    TransactionStore,
};

pub struct ClinicData {
    pub patients: PatientStore,
    pub doctors: DoctorStore,
    pub appointments: AppointmentStore,
    pub transactions: TransactionStore,
    pub budgets: BudgetStore,
    pub exams: ExamStore,
    pub settings: SettingsStore,
    cache: Arc<QueryCache>,
    subscription: SubscriptionGuard,
}

impl ClinicData {
    /// Build the store set over `backend` and subscribe the shared cache to
    /// its change feed. Must be called from within a tokio runtime.
    pub fn new<B>(backend: Arc<B>) -> Self
    where
        B: TableBackend + ChangeFeed + 'static,
    {
        let cache = Arc::new(QueryCache::new());
        let subscription = FeedSubscriber::attach(
            backend.clone() as Arc<dyn ChangeFeed>,
            Arc::clone(&cache),
            &Table::TRACKED,
        );
        let tables = backend as Arc<dyn TableBackend>;

        Self {
            patients: PatientStore::new(tables.clone(), Arc::clone(&cache)),
            doctors: DoctorStore::new(tables.clone(), Arc::clone(&cache)),
            appointments: AppointmentStore::new(tables.clone(), Arc::clone(&cache)),
            transactions: TransactionStore::new(tables.clone(), Arc::clone(&cache)),
            budgets: BudgetStore::new(tables.clone(), Arc::clone(&cache)),
            exams: ExamStore::new(tables.clone(), Arc::clone(&cache)),
            settings: SettingsStore::new(tables),
            cache,
            subscription,
        }
    }

    /// Whether the change feed is currently connected. While `false`, reads
    /// may serve stale cached rows until the cache is dropped or re-primed.
    pub fn feed_connected(&self) -> bool {
        self.subscription.is_connected()
    }

    /// Drop every cached query result. Useful after a feed reconnect, when
    /// invalidations may have been missed.
    pub fn clear_cache(&self) {
        let dropped = self.cache.clear();
        tracing::info!(dropped, "query cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::models::enums::PersonStatus;
    use crate::models::{NewPatient, PatientFilter};
    use std::time::Duration;

    fn new_patient(name: &str) -> NewPatient {
        NewPatient {
            name: name.into(),
            phone: "(11) 99999-0000".into(),
            email: None,
            birth_date: None,
            cpf: None,
            allergies: None,
            medications: None,
            preferred_doctor: None,
            status: PersonStatus::Active,
        }
    }

    async fn settle() {
        // Let the subscriber tasks drain the broadcast channel.
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn writes_invalidate_reads_through_the_feed() {
        let backend = Arc::new(MemoryBackend::new());
        let data = ClinicData::new(backend.clone());

        data.patients.create(new_patient("Ana")).await.unwrap();
        settle().await;

        let filter = PatientFilter::default();
        assert_eq!(data.patients.list(&filter).await.unwrap().len(), 1);
        let after_first = backend.selects_served();

        // Cached: no extra backend read.
        data.patients.list(&filter).await.unwrap();
        assert_eq!(backend.selects_served(), after_first);

        // A write invalidates; the next list refetches and sees the row.
        data.patients.create(new_patient("Bia")).await.unwrap();
        settle().await;
        assert_eq!(data.patients.list(&filter).await.unwrap().len(), 2);
        assert!(backend.selects_served() > after_first);
    }

    #[tokio::test]
    async fn feed_status_and_manual_clear() {
        let backend = Arc::new(MemoryBackend::new());
        let data = ClinicData::new(backend.clone());
        assert!(data.feed_connected());

        data.patients.create(new_patient("Ana")).await.unwrap();
        settle().await;
        data.patients.list(&PatientFilter::default()).await.unwrap();

        backend.set_connected(false);
        assert!(!data.feed_connected());

        // Disconnected: the write emits nothing, the stale cache survives.
        data.patients.create(new_patient("Bia")).await.unwrap();
        settle().await;
        assert_eq!(
            data.patients
                .list(&PatientFilter::default())
                .await
                .unwrap()
                .len(),
            1,
            "stale read expected while feed is down"
        );

        // Manual recovery path.
        data.clear_cache();
        assert_eq!(
            data.patients
                .list(&PatientFilter::default())
                .await
                .unwrap()
                .len(),
            2
        );
    }
}
