//! Change-feed subscriber — keeps the query cache eventually consistent
//! with backend state without polling.
//!
//! [`FeedSubscriber::attach`] opens one subscription task per tracked table.
//! Any event for table T (insert, update, or delete — the op is not
//! distinguished) invalidates the whole cache namespace for T, forcing the
//! next read to refetch. The returned [`SubscriptionGuard`] aborts every
//! task on drop, whether or not an error occurred while subscribed.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::backend::{ChangeFeed, Table};
use crate::cache::QueryCache;

pub struct FeedSubscriber;

impl FeedSubscriber {
    /// Subscribe `cache` to change events for `tables`. Must be called from
    /// within a tokio runtime.
    pub fn attach(
        feed: Arc<dyn ChangeFeed>,
        cache: Arc<QueryCache>,
        tables: &[Table],
    ) -> SubscriptionGuard {
        let tasks = tables
            .iter()
            .map(|&table| {
                let mut rx = feed.changes(table);
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    loop {
                        match rx.recv().await {
                            Ok(event) => {
                                tracing::debug!(
                                    table = %event.table,
                                    op = ?event.op,
                                    "change event received"
                                );
                                cache.invalidate_table(event.table);
                            }
                            Err(RecvError::Lagged(missed)) => {
                                // Missed events collapse into one coarse
                                // invalidation; nothing is lost because
                                // invalidation is idempotent.
                                tracing::warn!(table = %table, missed, "change feed lagged");
                                cache.invalidate_table(table);
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                })
            })
            .collect();

        SubscriptionGuard {
            tasks,
            feed: Arc::clone(&feed),
        }
    }
}

/// Owns the subscription tasks; dropping it closes every channel.
pub struct SubscriptionGuard {
    tasks: Vec<JoinHandle<()>>,
    feed: Arc<dyn ChangeFeed>,
}

impl SubscriptionGuard {
    /// Connection status of the underlying feed. Per-event delivery
    /// failures are not observable — this boolean is all there is.
    pub fn is_connected(&self) -> bool {
        self.feed.is_connected()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        tracing::debug!(count = self.tasks.len(), "change-feed subscriptions closed");
    }
}
