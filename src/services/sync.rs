//! Refresh protocol shared by every cached entity.
//!
//! Each entity owns one refresh lock. A refresh holds it from launch until
//! the merge has settled, so at most one refresh per entity is ever in
//! flight. Callers that find the lock taken either return immediately or,
//! when blocking, wait for the running refresh instead of starting another.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::SyncError;
use crate::domain::Priority;

#[async_trait::async_trait]
pub trait Refresh: Send + Sync + 'static {
    fn refresh_lock(&self) -> &Arc<Mutex<()>>;

    /// Short label for log lines.
    fn describe(&self) -> String;

    /// When the cached record was last merged, `None` if nothing is cached.
    async fn last_updated(&self) -> Option<DateTime<Utc>>;

    /// Fetches from the remote service and merges into the cache.
    ///
    /// Called with the refresh lock held; must not wait on it.
    async fn refresh(&self, priority: Priority) -> Result<(), SyncError>;
}

/// Launches a refresh unless one is already running.
///
/// With `block` the call returns once the refresh (new or already running)
/// has completed, and reports the refresh's own error. Without it the
/// refresh runs in the background and its errors are only logged.
pub async fn update<E: Refresh>(entity: &Arc<E>, block: bool) -> Result<(), SyncError> {
    let Ok(guard) = Arc::clone(entity.refresh_lock()).try_lock_owned() else {
        debug!(entity = %entity.describe(), block, "Refresh already in flight");
        if block {
            drop(entity.refresh_lock().lock().await);
        }
        return Ok(());
    };

    let priority = Priority::for_blocking(block);
    debug!(entity = %entity.describe(), ?priority, "Launching refresh");

    let task_entity = Arc::clone(entity);
    let handle = tokio::spawn(async move {
        let _guard = guard;
        let result = task_entity.refresh(priority).await;
        if let Err(e) = &result {
            warn!(entity = %task_entity.describe(), error = %e, "Refresh failed");
        }
        result
    });

    if block {
        handle
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
    } else {
        Ok(())
    }
}

/// Refreshes only when the cached record is missing or older than `max_age`.
///
/// A missing record always blocks; there is nothing to serve meanwhile.
pub async fn update_if_old<E: Refresh>(
    entity: &Arc<E>,
    max_age: TimeDelta,
    block: bool,
) -> Result<(), SyncError> {
    match entity.last_updated().await {
        None => update(entity, true).await,
        Some(updated) if updated <= Utc::now() - max_age => update(entity, block).await,
        Some(_) => Ok(()),
    }
}

/// Unwraps the outcome of a cache write, logging a failure as rolled back.
///
/// Storage failures never abort a refresh; the in-memory state simply stays
/// as it was.
pub fn settle<T>(what: &str, result: anyhow::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Failed to commit {what}, changes rolled back");
            None
        }
    }
}
