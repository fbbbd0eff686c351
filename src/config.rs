//! Application constants and backend connection configuration.

use thiserror::Error;

pub const APP_NAME: &str = "Clinica";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,clinica=debug"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),
}

/// Connection parameters for the hosted backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the hosted platform, e.g. `https://xyz.backend.example`.
    pub base_url: String,
    /// Project API key, sent as `apikey` and bearer token.
    pub api_key: String,
    /// Object-storage bucket for exam uploads.
    pub storage_bucket: String,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            storage_bucket: "exams".into(),
        }
    }

    /// Read `CLINICA_BACKEND_URL` / `CLINICA_API_KEY` (and optionally
    /// `CLINICA_STORAGE_BUCKET`) from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("CLINICA_BACKEND_URL")
            .map_err(|_| ConfigError::MissingVar("CLINICA_BACKEND_URL"))?;
        let api_key = std::env::var("CLINICA_API_KEY")
            .map_err(|_| ConfigError::MissingVar("CLINICA_API_KEY"))?;
        let mut config = Self::new(base_url, api_key);
        if let Ok(bucket) = std::env::var("CLINICA_STORAGE_BUCKET") {
            config.storage_bucket = bucket;
        }
        Ok(config)
    }

    /// REST endpoint for a named table.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Object upload endpoint for a path inside the configured bucket.
    pub fn storage_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.storage_bucket, path
        )
    }

    /// Public download URL for an uploaded object.
    pub fn storage_public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.storage_bucket, path
        )
    }

    /// Websocket endpoint for the realtime change feed.
    pub fn realtime_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{ws_base}/realtime/v1/websocket?apikey={}", self.api_key)
    }
}
