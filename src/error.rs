//! Error taxonomy for the data layer.
//!
//! Two tiers: [`BackendError`] for anything that goes wrong talking to the
//! hosted platform, and [`StoreError`] for the store-level vocabulary the
//! view layer consumes. `StoreError`'s `Display` output is what gets shown
//! to the user as a notification; none of these are retried automatically.

use thiserror::Error;
use uuid::Uuid;

/// A failed backend table, storage, or realtime operation.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {code}: {message}")]
    Status { code: u16, message: String },

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("realtime transport: {0}")]
    Realtime(String),

    #[error("realtime channel closed")]
    ChannelClosed,
}

/// Store-level errors surfaced to the view layer.
///
/// Not-found handling is uniform across all entity stores: `update` on a
/// missing id yields `NotFound`, `delete` returns `Ok(false)` — never a
/// silent null in one store and a panic in another.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("validation failed for {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: String,
    },

    #[error("invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}

impl StoreError {
    pub(crate) fn required(field: &'static str) -> Self {
        StoreError::Validation {
            field,
            reason: "required".into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Backend(BackendError::Serialization(e))
    }
}
