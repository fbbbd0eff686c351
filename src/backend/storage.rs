//! Object storage for exam uploads.
//!
//! One operation: upload bytes, get back `{name, url, size}`. No retry —
//! a failed upload surfaces to the caller and nothing is written to the
//! exam row.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::error::BackendError;

/// Result of a successful upload, stored verbatim on the exam row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub name: String,
    pub url: String,
    pub size: u64,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<StoredFile, BackendError>;
}

/// In-process storage for tests and offline development.
#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<String, u64>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files uploaded so far.
    pub fn file_count(&self) -> usize {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<StoredFile, BackendError> {
        let size = bytes.len() as u64;
        let url = format!("mem://exams/{}/{name}", Uuid::new_v4());
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.clone(), size);
        Ok(StoredFile {
            name: name.to_string(),
            url,
            size,
        })
    }
}

/// Uploads into the hosted platform's storage bucket.
pub struct RestStorage {
    http: reqwest::Client,
    config: BackendConfig,
}

impl RestStorage {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ObjectStorage for RestStorage {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<StoredFile, BackendError> {
        let size = bytes.len() as u64;
        // Prefix with a fresh id so repeated uploads of the same filename
        // never collide in the bucket.
        let path = format!("{}/{name}", Uuid::new_v4());
        let response = self
            .http
            .post(self.config.storage_url(&path))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                code: status.as_u16(),
                message,
            });
        }

        Ok(StoredFile {
            name: name.to_string(),
            url: self.config.storage_public_url(&path),
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_upload_reports_name_and_size() {
        let storage = MemoryStorage::new();
        let stored = storage
            .upload("hemograma.pdf", vec![0u8; 2048])
            .await
            .unwrap();
        assert_eq!(stored.name, "hemograma.pdf");
        assert_eq!(stored.size, 2048);
        assert!(stored.url.starts_with("mem://exams/"));
        assert_eq!(storage.file_count(), 1);
    }

    #[tokio::test]
    async fn repeated_uploads_get_distinct_urls() {
        let storage = MemoryStorage::new();
        let a = storage.upload("scan.png", vec![1]).await.unwrap();
        let b = storage.upload("scan.png", vec![2]).await.unwrap();
        assert_ne!(a.url, b.url);
    }
}
