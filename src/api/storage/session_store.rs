//! Run session store.
//!
//! Keeps one record per run under `run-<id>`, where the id is the creation
//! time in unix milliseconds. Sessions are ephemeral: a background task drops
//! them once they outlive the configured TTL.

use chrono::{Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, error, info};

use super::traits::{get_json, put_json};
use super::{KeyValueStore, StorageError};
use crate::models::{Run, RunState};

const RUN_KEY_PREFIX: &str = "run-";

/// Keyed storage of run snapshots.
#[derive(Clone)]
pub struct RunSessionStore {
    store: Arc<dyn KeyValueStore>,
    last_id: Arc<AtomicI64>,
}

impl RunSessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            last_id: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Allocate a time-based run id, strictly increasing within this process.
    pub fn next_run_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_id.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last_id.compare_exchange_weak(
                last,
                candidate,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(current) => last = current,
            }
        }
    }

    /// Get a run by ID
    pub async fn get_run(&self, run_id: i64) -> Result<Option<Run>, StorageError> {
        get_json(self.store.as_ref(), &Run::key(run_id)).await
    }

    /// Get a run or fail with `NotFound`
    pub async fn require_run(&self, run_id: i64) -> Result<Run, StorageError> {
        self.get_run(run_id)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity_type: "run".to_string(),
                entity_id: run_id.to_string(),
            })
    }

    /// Insert or replace a run
    pub async fn save_run(&self, run: &Run) -> Result<(), StorageError> {
        put_json(self.store.as_ref(), &Run::key(run.run_id), run).await
    }

    pub async fn delete_run(&self, run_id: i64) -> Result<bool, StorageError> {
        self.store.delete(&Run::key(run_id)).await
    }

    pub async fn list_run_ids(&self) -> Result<Vec<i64>, StorageError> {
        let keys = self.store.keys(RUN_KEY_PREFIX).await?;
        Ok(keys
            .iter()
            .filter_map(|k| k.strip_prefix(RUN_KEY_PREFIX)?.parse().ok())
            .collect())
    }

    /// Remove runs created more than `ttl` ago. Returns how many were removed.
    pub async fn purge_expired(&self, ttl: Duration) -> Result<usize, StorageError> {
        let cutoff = Utc::now() - ttl;
        let mut removed = 0;
        for run_id in self.list_run_ids().await? {
            let expired = match self.get_run(run_id).await {
                // Generation still writes into running sessions
                Ok(Some(run)) => run.state != RunState::Running && run.created_at < cutoff,
                Ok(None) => false,
                // Unreadable sessions cannot be resumed either
                Err(StorageError::Serialization(_)) => true,
                Err(e) => return Err(e),
            };
            if expired && self.delete_run(run_id).await? {
                debug!(run_id, "Expired run session removed");
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Start background task to clean up expired run sessions
pub async fn start_session_cleanup_task(sessions: RunSessionStore, ttl: Duration) {
    let period = ttl
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(3600))
        .clamp(
            std::time::Duration::from_secs(1),
            std::time::Duration::from_secs(3600),
        );
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        match sessions.purge_expired(ttl).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Expired run sessions cleaned up"),
            Err(e) => error!("Failed to cleanup expired run sessions: {}", e),
        }
    }
}
