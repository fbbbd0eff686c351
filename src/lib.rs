//! Data layer for a single-clinic administrative dashboard.
//!
//! Entity stores wrap a hosted table backend with validation and a query
//! cache; a change-feed subscriber invalidates cached reads as rows change
//! upstream; [`reports`] folds fetched rows into the dashboard numbers.
//! [`state::ClinicData`] is the facade the view layer holds.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod realtime;
pub mod reports;
pub mod state;
pub mod stores;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Call once at startup, before the
/// first store is built.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);
}
