//! Apply reconciler: writes generated content back to the catalog.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::catalog_service::{
    CatalogApi, CatalogError, ProductUpdateInput, SeoInput, UpdatedProduct,
};
use crate::models::product::product_gid;
use crate::models::{Destination, DestinationSet, GenerationResult, UserError};

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Generation failed for this product; nothing to apply")]
    GenerationFailed,
    #[error("No generated content for the requested destinations")]
    NothingToApply,
    #[error("Catalog rejected the update")]
    UserErrors(Vec<UserError>),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Convert plain text into one paragraph per non-empty line.
pub fn description_html(text: &str) -> String {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("<p>{line}</p>"))
        .collect()
}

/// Map a product's generated values onto a sparse catalog update.
///
/// Only destinations that were requested and actually carry generated text
/// end up in the update; everything else is left out so it is never cleared.
pub fn build_update_input(
    result: &GenerationResult,
    destinations: &DestinationSet,
) -> ProductUpdateInput {
    let requested = |destination: Destination| {
        if destinations.contains(destination) {
            result.generated(destination).filter(|v| !v.is_empty())
        } else {
            None
        }
    };

    let mut input = ProductUpdateInput {
        id: product_gid(&result.product.id),
        ..Default::default()
    };

    input.title = requested(Destination::ProductTitle).map(str::to_string);
    input.description_html = requested(Destination::ProductDescription)
        .map(description_html)
        .filter(|html| !html.is_empty());

    let seo = SeoInput {
        title: requested(Destination::SeoTitle).map(str::to_string),
        description: requested(Destination::SeoDescription).map(str::to_string),
    };
    if seo.title.is_some() || seo.description.is_some() {
        input.seo = Some(seo);
    }

    input
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApplyOutcomeStatus {
    Applied,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductApplyOutcome {
    pub product_id: String,
    pub status: ApplyOutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_errors: Vec<UserError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<UpdatedProduct>,
}

impl ProductApplyOutcome {
    fn from_result(product_id: &str, result: Result<UpdatedProduct, ApplyError>) -> Self {
        let mut outcome = Self {
            product_id: product_id.to_string(),
            status: ApplyOutcomeStatus::Applied,
            error: None,
            user_errors: Vec::new(),
            product: None,
        };
        match result {
            Ok(product) => outcome.product = Some(product),
            Err(e @ (ApplyError::GenerationFailed | ApplyError::NothingToApply)) => {
                outcome.status = ApplyOutcomeStatus::Skipped;
                outcome.error = Some(e.to_string());
            }
            Err(ApplyError::UserErrors(user_errors)) => {
                outcome.status = ApplyOutcomeStatus::Failed;
                outcome.error = Some("Catalog rejected the update".to_string());
                outcome.user_errors = user_errors;
            }
            Err(e @ ApplyError::Catalog(_)) => {
                outcome.status = ApplyOutcomeStatus::Failed;
                outcome.error = Some(e.to_string());
            }
        }
        outcome
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApplySummary {
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Per-product outcomes of a bulk apply plus totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BulkApplyReport {
    pub outcomes: Vec<ProductApplyOutcome>,
    pub summary: ApplySummary,
}

impl BulkApplyReport {
    pub fn push(&mut self, outcome: ProductApplyOutcome) {
        match outcome.status {
            ApplyOutcomeStatus::Applied => self.summary.applied += 1,
            ApplyOutcomeStatus::Failed => self.summary.failed += 1,
            ApplyOutcomeStatus::Skipped => self.summary.skipped += 1,
        }
        self.outcomes.push(outcome);
    }
}

pub struct ApplyReconciler {
    catalog: Arc<dyn CatalogApi>,
}

impl ApplyReconciler {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self { catalog }
    }

    /// Apply one product's generated content with a single mutation.
    pub async fn apply_single(
        &self,
        result: &GenerationResult,
        destinations: &DestinationSet,
    ) -> Result<UpdatedProduct, ApplyError> {
        if result.is_failed() {
            return Err(ApplyError::GenerationFailed);
        }
        let input = build_update_input(result, destinations);
        if input.is_empty() {
            return Err(ApplyError::NothingToApply);
        }

        let outcome = self.catalog.update_product(&input).await.inspect_err(|e| {
            error!(product_id = %result.product.id, "Apply error: {}", e);
        })?;

        if !outcome.user_errors.is_empty() {
            warn!(
                product_id = %result.product.id,
                errors = outcome.user_errors.len(),
                "Catalog rejected product update"
            );
            return Err(ApplyError::UserErrors(outcome.user_errors));
        }

        let product = outcome
            .product
            .ok_or(CatalogError::MissingData("productUpdate.product"))?;
        info!(product_id = %result.product.id, "Generated content applied");
        Ok(product)
    }

    /// Apply every product in turn, continuing past failures.
    pub async fn apply_all(
        &self,
        results: &[GenerationResult],
        destinations: &DestinationSet,
    ) -> BulkApplyReport {
        let mut report = BulkApplyReport::default();
        for result in results {
            let applied = self.apply_single(result, destinations).await;
            report.push(ProductApplyOutcome::from_result(&result.product.id, applied));
        }
        info!(
            applied = report.summary.applied,
            failed = report.summary.failed,
            skipped = report.summary.skipped,
            "Bulk apply finished"
        );
        report
    }

    /// Outcome record for a single apply attempt.
    pub fn outcome(product_id: &str, result: Result<UpdatedProduct, ApplyError>) -> ProductApplyOutcome {
        ProductApplyOutcome::from_result(product_id, result)
    }
}
