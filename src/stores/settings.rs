use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{from_row, to_row};
use crate::backend::{EqFilter, Table, TableBackend};
use crate::error::StoreError;
use crate::models::{ClinicSettings, SettingsUpdate};

/// Single-row settings access. Reads bypass the query cache: the settings
/// table is not on the change feed, so a cached copy would never be
/// invalidated.
pub struct SettingsStore {
    backend: Arc<dyn TableBackend>,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self { backend }
    }

    /// The stored settings row, or defaults when the clinic has not saved
    /// any yet. Never errors on an empty table.
    pub async fn get_or_default(&self) -> Result<ClinicSettings, StoreError> {
        let mut rows = self.backend.select(Table::Settings, &EqFilter::new()).await?;
        match rows.pop() {
            Some(row) => from_row(row),
            None => Ok(ClinicSettings {
                id: Uuid::nil(),
                clinic_name: String::new(),
                phone: None,
                email: None,
                monthly_goal: 0.0,
                created_at: Utc::now(),
            }),
        }
    }

    /// Upsert: patch the existing row if one exists, insert otherwise.
    pub async fn save(&self, update: SettingsUpdate) -> Result<ClinicSettings, StoreError> {
        if update.clinic_name.trim().is_empty() {
            return Err(StoreError::required("clinic_name"));
        }
        let mut rows = self.backend.select(Table::Settings, &EqFilter::new()).await?;
        match rows.pop() {
            Some(row) => {
                let current: ClinicSettings = from_row(row)?;
                match self
                    .backend
                    .update(Table::Settings, current.id, to_row(&update)?)
                    .await?
                {
                    Some(updated) => from_row(updated),
                    None => Err(StoreError::NotFound {
                        entity: "settings",
                        id: current.id,
                    }),
                }
            }
            None => {
                let row = self.backend.insert(Table::Settings, to_row(&update)?).await?;
                tracing::info!("settings row created");
                from_row(row)
            }
        }
    }
}
