//! Apply routes: write generated content back to the catalog.

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    response::Json,
    routing::post,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::app_state::AppState;
use super::error::ApiError;
use crate::models::{DestinationSet, GenerationResult};
use crate::services::BatchError;
use crate::services::apply_service::BulkApplyReport;
use crate::services::catalog_service::UpdatedProduct;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplySingleRequest {
    pub product: GenerationResult,
    #[serde(default)]
    pub destinations: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplySingleResponse {
    pub success: bool,
    pub product: UpdatedProduct,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyAllRequest {
    #[serde(default)]
    pub products: Vec<GenerationResult>,
    #[serde(default)]
    pub destinations: Vec<String>,
}

/// Create the apply router
pub fn apply_router() -> Router<AppState> {
    Router::new()
        .route("/apply-single", post(apply_single))
        .route("/apply-all", post(apply_all))
}

/// POST /apply-single - Apply one product's generated content
#[utoipa::path(
    post,
    path = "/apply-single",
    tag = "Apply",
    request_body = ApplySingleRequest,
    responses(
        (status = 200, description = "Product updated", body = ApplySingleResponse),
        (status = 400, description = "Nothing to apply or update rejected by Shopify"),
        (status = 500, description = "Catalog request failed")
    )
)]
pub async fn apply_single(
    State(state): State<AppState>,
    request: Result<Json<ApplySingleRequest>, JsonRejection>,
) -> Result<Json<ApplySingleResponse>, ApiError> {
    let Json(request) = request?;
    let destinations = DestinationSet::parse(&request.destinations);
    let product = state
        .reconciler
        .apply_single(&request.product, &destinations)
        .await?;
    Ok(Json(ApplySingleResponse {
        success: true,
        product,
    }))
}

/// POST /apply-all - Apply every product, reporting each outcome
#[utoipa::path(
    post,
    path = "/apply-all",
    tag = "Apply",
    request_body = ApplyAllRequest,
    responses(
        (status = 200, description = "Per-product outcomes and summary", body = BulkApplyReport),
        (status = 400, description = "No products or no destinations")
    )
)]
pub async fn apply_all(
    State(state): State<AppState>,
    request: Result<Json<ApplyAllRequest>, JsonRejection>,
) -> Result<Json<BulkApplyReport>, ApiError> {
    let Json(request) = request?;
    if request.products.is_empty() {
        return Err(BatchError::NoProducts.into());
    }
    let destinations = DestinationSet::parse(&request.destinations);
    if destinations.is_empty() {
        return Err(BatchError::NoDestinations.into());
    }

    Ok(Json(
        state
            .reconciler
            .apply_all(&request.products, &destinations)
            .await,
    ))
}
