use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::flow::Flow;
use super::generation::GenerationResult;
use super::product::UserError;

/// Apply status of one product within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyStatus {
    /// Generation has not finished for this product.
    Pending,
    NotApplied,
    Applied,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Created,
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunProduct {
    #[serde(flatten)]
    pub result: GenerationResult,
    pub status: ApplyStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_errors: Vec<UserError>,
}

impl RunProduct {
    pub fn pending(result: GenerationResult) -> Self {
        Self {
            result,
            status: ApplyStatus::Pending,
            user_errors: Vec::new(),
        }
    }

    /// Status right after generation: failed products cannot be applied.
    pub fn from_generation(result: GenerationResult) -> Self {
        let status = if result.is_failed() {
            ApplyStatus::Failed
        } else {
            ApplyStatus::NotApplied
        };
        Self {
            result,
            status,
            user_errors: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.result.product.id
    }
}

/// One execution of a flow against a selected product set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub run_id: i64,
    pub created_at: DateTime<Utc>,
    pub state: RunState,
    pub flow: Flow,
    pub products: Vec<RunProduct>,
}

impl Run {
    /// Storage key of a run session.
    pub fn key(run_id: i64) -> String {
        format!("run-{run_id}")
    }

    pub fn product_mut(&mut self, product_id: &str) -> Option<&mut RunProduct> {
        self.products.iter_mut().find(|p| p.id() == product_id)
    }

    pub fn completed(&self) -> usize {
        self.products
            .iter()
            .filter(|p| matches!(p.status, ApplyStatus::NotApplied | ApplyStatus::Applied))
            .count()
    }
}
