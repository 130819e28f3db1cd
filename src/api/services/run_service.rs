//! Run service: executes a flow against a product snapshot and tracks the
//! per-product apply status in the run session store.
//!
//! Generation runs on a spawned task so a dropped client connection cannot
//! leave a run stuck in `running`. Each in-flight run holds a cancellation
//! token derived from the service's shutdown token.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::apply_service::{ApplyError, ApplyOutcomeStatus, ApplyReconciler, BulkApplyReport};
use super::flow_service::{FlowError, FlowService};
use super::generation_service::{BatchError, BatchRunner};
use crate::models::{
    ApplyStatus, GenerationResult, Product, Run, RunProduct, RunState, UserError,
};
use crate::storage::{RunSessionStore, StorageError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Product {product_id} is not part of run {run_id}")]
    ProductNotInRun { run_id: i64, product_id: String },
    #[error("Run {0} is generating; try again when it has finished")]
    Busy(i64),
    #[error("Product {0} has no generated content yet")]
    NotGenerated(String),
    #[error("Product {0} has already been applied")]
    AlreadyApplied(String),
    #[error("Generation task failed: {0}")]
    Task(String),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Keep the first occurrence of each product id.
fn dedup_products(products: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect()
}

type ApplyLocks = Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>;

/// Exclusive apply access to one run. The run's lock entry is removed once
/// nobody holds or waits for it.
struct RunApplyGuard {
    locks: ApplyLocks,
    run_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RunApplyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks
            .get(&self.run_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.run_id);
        }
    }
}

#[derive(Clone)]
pub struct RunService {
    sessions: RunSessionStore,
    flows: Arc<FlowService>,
    batch: Arc<BatchRunner>,
    reconciler: Arc<ApplyReconciler>,
    shutdown: CancellationToken,
    in_flight: Arc<Mutex<HashMap<i64, CancellationToken>>>,
    /// Held across check, catalog call and status write of every apply
    apply_locks: ApplyLocks,
    write_lock: Arc<AsyncMutex<()>>,
}

impl RunService {
    pub fn new(
        sessions: RunSessionStore,
        flows: Arc<FlowService>,
        batch: Arc<BatchRunner>,
        reconciler: Arc<ApplyReconciler>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            sessions,
            flows,
            batch,
            reconciler,
            shutdown,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            apply_locks: Arc::new(Mutex::new(HashMap::new())),
            write_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn sessions(&self) -> &RunSessionStore {
        &self.sessions
    }

    /// Snapshot a flow and the selected products into a new run.
    pub async fn create_run(&self, flow_id: &str, products: Vec<Product>) -> Result<Run, RunError> {
        let flow = self.flows.get_flow(flow_id).await?;
        let products = dedup_products(products);
        BatchRunner::validate(&products, &flow.destination_set())?;

        let run = Run {
            run_id: self.sessions.next_run_id(),
            created_at: chrono::Utc::now(),
            state: RunState::Created,
            flow,
            products: products
                .into_iter()
                .map(|p| RunProduct::pending(GenerationResult::pending(p)))
                .collect(),
        };
        self.sessions.save_run(&run).await?;

        info!(run_id = run.run_id, flow_id, products = run.products.len(), "Created run");
        Ok(run)
    }

    pub async fn get_run(&self, run_id: i64) -> Result<Run, RunError> {
        Ok(self.sessions.require_run(run_id).await?)
    }

    /// Cancel any in-flight generation and drop the session.
    pub async fn delete_run(&self, run_id: i64) -> Result<(), RunError> {
        if let Some(token) = self.take_token(run_id) {
            token.cancel();
        }
        if !self.sessions.delete_run(run_id).await? {
            return Err(StorageError::NotFound {
                entity_type: "run".to_string(),
                entity_id: run_id.to_string(),
            }
            .into());
        }
        info!(run_id, "Deleted run");
        Ok(())
    }

    /// Generate content for every product of a run and wait for the results.
    ///
    /// Earlier results and apply statuses are replaced.
    pub async fn generate(&self, run_id: i64) -> Result<Run, RunError> {
        let (run, token) = {
            // Waits for in-flight applies before statuses are reset
            let _apply = self.lock_run_applies(run_id).await;
            let _guard = self.write_lock.lock().await;
            let mut run = self.sessions.require_run(run_id).await?;
            if run.state == RunState::Running {
                return Err(RunError::Busy(run_id));
            }
            BatchRunner::validate(
                &run.products.iter().map(|p| p.result.product.clone()).collect::<Vec<_>>(),
                &run.flow.destination_set(),
            )?;

            run.state = RunState::Running;
            for product in &mut run.products {
                *product = RunProduct::pending(GenerationResult::pending(product.result.product.clone()));
            }
            self.sessions.save_run(&run).await?;

            let token = self.shutdown.child_token();
            self.lock_in_flight().insert(run_id, token.clone());
            (run, token)
        };

        let service = self.clone();
        let task_token = token.clone();
        let handle = tokio::spawn(async move { service.finish_generation(run, task_token).await });
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(RunError::Task(e.to_string())),
        };
        if let Err(e) = &outcome {
            error!(run_id, "Run generation failed: {}", e);
            self.release_running(run_id, token.is_cancelled()).await;
        }
        outcome
    }

    /// Move a run out of `running` after its generation failed.
    async fn release_running(&self, run_id: i64, cancelled: bool) {
        self.take_token(run_id);
        let _guard = self.write_lock.lock().await;
        match self.sessions.get_run(run_id).await {
            Ok(Some(mut run)) if run.state == RunState::Running => {
                run.state = if cancelled {
                    RunState::Cancelled
                } else {
                    RunState::Completed
                };
                if let Err(e) = self.sessions.save_run(&run).await {
                    error!(run_id, "Failed to release run: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => error!(run_id, "Failed to release run: {}", e),
        }
    }

    async fn finish_generation(&self, run: Run, token: CancellationToken) -> Result<Run, RunError> {
        let run_id = run.run_id;
        let products: Vec<Product> = run
            .products
            .iter()
            .map(|p| p.result.product.clone())
            .collect();
        let destinations = run.flow.destination_set();

        let outcome = self
            .batch
            .run(products, run.flow.run_prompt(), &destinations, token.clone())
            .await;
        self.take_token(run_id);
        let results = outcome?;

        let _guard = self.write_lock.lock().await;
        let mut run = match self.sessions.get_run(run_id).await? {
            Some(run) => run,
            None => {
                warn!(run_id, "Run removed while generating; discarding results");
                return Err(StorageError::NotFound {
                    entity_type: "run".to_string(),
                    entity_id: run_id.to_string(),
                }
                .into());
            }
        };

        let mut by_id: HashMap<String, GenerationResult> = results
            .into_iter()
            .map(|r| (r.product.id.clone(), r))
            .collect();
        for product in &mut run.products {
            if let Some(result) = by_id.remove(product.id()) {
                *product = RunProduct::from_generation(result);
            }
        }
        run.state = if token.is_cancelled() {
            RunState::Cancelled
        } else {
            RunState::Completed
        };
        self.sessions.save_run(&run).await?;

        info!(
            run_id,
            state = ?run.state,
            ready = run.completed(),
            total = run.products.len(),
            "Run generation finished"
        );
        Ok(run)
    }

    /// Cancel in-flight generation. Returns whether anything was running.
    pub async fn cancel(&self, run_id: i64) -> Result<bool, RunError> {
        self.sessions.require_run(run_id).await?;
        match self.take_token(run_id) {
            Some(token) => {
                token.cancel();
                info!(run_id, "Run generation cancelled");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply one product of a run and record the outcome.
    pub async fn apply_product(&self, run_id: i64, product_id: &str) -> Result<RunProduct, RunError> {
        let _apply = self.lock_run_applies(run_id).await;
        let run = self.sessions.require_run(run_id).await?;
        if run.state == RunState::Running {
            return Err(RunError::Busy(run_id));
        }
        let product = run
            .products
            .iter()
            .find(|p| p.id() == product_id)
            .ok_or_else(|| RunError::ProductNotInRun {
                run_id,
                product_id: product_id.to_string(),
            })?;
        match product.status {
            ApplyStatus::Pending => return Err(RunError::NotGenerated(product_id.to_string())),
            ApplyStatus::Applied => return Err(RunError::AlreadyApplied(product_id.to_string())),
            ApplyStatus::NotApplied | ApplyStatus::Failed => {}
        }

        let outcome = self
            .reconciler
            .apply_single(&product.result, &run.flow.destination_set())
            .await;
        let (status, user_errors) = match &outcome {
            Ok(_) => (ApplyStatus::Applied, Vec::new()),
            Err(ApplyError::UserErrors(errors)) => (ApplyStatus::Failed, errors.clone()),
            Err(ApplyError::Catalog(_)) => (ApplyStatus::Failed, Vec::new()),
            Err(ApplyError::GenerationFailed | ApplyError::NothingToApply) => {
                (product.status, product.user_errors.clone())
            }
        };

        let updated = self
            .record_statuses(run_id, vec![(product_id.to_string(), status, user_errors)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RunError::ProductNotInRun {
                run_id,
                product_id: product_id.to_string(),
            })?;

        outcome?;
        Ok(updated)
    }

    /// Apply every `not-applied` product of a run, continuing past failures.
    pub async fn apply_all(&self, run_id: i64) -> Result<BulkApplyReport, RunError> {
        let _apply = self.lock_run_applies(run_id).await;
        let run = self.sessions.require_run(run_id).await?;
        if run.state == RunState::Running {
            return Err(RunError::Busy(run_id));
        }

        let candidates: Vec<GenerationResult> = run
            .products
            .iter()
            .filter(|p| p.status == ApplyStatus::NotApplied)
            .map(|p| p.result.clone())
            .collect();
        let report = self
            .reconciler
            .apply_all(&candidates, &run.flow.destination_set())
            .await;

        let updates = report
            .outcomes
            .iter()
            .filter_map(|o| {
                let status = match o.status {
                    ApplyOutcomeStatus::Applied => ApplyStatus::Applied,
                    ApplyOutcomeStatus::Failed => ApplyStatus::Failed,
                    ApplyOutcomeStatus::Skipped => return None,
                };
                Some((o.product_id.clone(), status, o.user_errors.clone()))
            })
            .collect();
        self.record_statuses(run_id, updates).await?;

        Ok(report)
    }

    /// Reload the run under the write lock and store new statuses.
    async fn record_statuses(
        &self,
        run_id: i64,
        updates: Vec<(String, ApplyStatus, Vec<UserError>)>,
    ) -> Result<Vec<RunProduct>, RunError> {
        let _guard = self.write_lock.lock().await;
        let mut run = self.sessions.require_run(run_id).await?;

        let mut updated = Vec::with_capacity(updates.len());
        for (product_id, status, user_errors) in updates {
            if let Some(product) = run.product_mut(&product_id) {
                product.status = status;
                product.user_errors = user_errors;
                updated.push(product.clone());
            }
        }
        self.sessions.save_run(&run).await?;
        Ok(updated)
    }

    async fn lock_run_applies(&self, run_id: i64) -> RunApplyGuard {
        let lock = self
            .apply_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(run_id)
            .or_default()
            .clone();
        RunApplyGuard {
            locks: self.apply_locks.clone(),
            run_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashMap<i64, CancellationToken>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_token(&self, run_id: i64) -> Option<CancellationToken> {
        self.lock_in_flight().remove(&run_id)
    }
}
