//! Run routes: execute a flow against selected products and apply the results.

use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::app_state::AppState;
use super::error::ApiError;
use crate::models::{Product, Run, RunProduct};
use crate::services::RunService;
use crate::services::apply_service::BulkApplyReport;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRunRequest {
    pub flow_id: String,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelRunResponse {
    /// False when nothing was generating
    pub cancelled: bool,
}

/// Create the runs router
pub fn runs_router() -> Router<AppState> {
    Router::new()
        .route("/runs", post(create_run))
        .route("/runs/{run_id}", get(get_run).delete(delete_run))
        .route("/runs/{run_id}/generate", post(generate_run))
        .route("/runs/{run_id}/cancel", post(cancel_run))
        .route("/runs/{run_id}/apply/{product_id}", post(apply_run_product))
        .route("/runs/{run_id}/apply-all", post(apply_run_all))
}

/// POST /runs - Snapshot a flow and selected products into a new run
#[utoipa::path(
    post,
    path = "/runs",
    tag = "Runs",
    request_body = CreateRunRequest,
    responses(
        (status = 201, description = "Run created", body = Run),
        (status = 400, description = "No products or flow has no usable destinations"),
        (status = 404, description = "Flow not found")
    )
)]
pub async fn create_run(
    State(runs): State<RunService>,
    request: Result<Json<CreateRunRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Run>), ApiError> {
    let Json(request) = request?;
    let run = runs.create_run(&request.flow_id, request.products).await?;
    Ok((StatusCode::CREATED, Json(run)))
}

/// GET /runs/{run_id} - Current run snapshot
#[utoipa::path(
    get,
    path = "/runs/{run_id}",
    tag = "Runs",
    params(("run_id" = i64, Path, description = "Run id")),
    responses(
        (status = 200, description = "Run", body = Run),
        (status = 404, description = "Run not found or expired")
    )
)]
pub async fn get_run(
    State(runs): State<RunService>,
    Path(run_id): Path<i64>,
) -> Result<Json<Run>, ApiError> {
    Ok(Json(runs.get_run(run_id).await?))
}

/// DELETE /runs/{run_id} - Cancel generation and drop the session
#[utoipa::path(
    delete,
    path = "/runs/{run_id}",
    tag = "Runs",
    params(("run_id" = i64, Path, description = "Run id")),
    responses(
        (status = 204, description = "Run deleted"),
        (status = 404, description = "Run not found or expired")
    )
)]
pub async fn delete_run(
    State(runs): State<RunService>,
    Path(run_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    runs.delete_run(run_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /runs/{run_id}/generate - Generate content for every product of the run
#[utoipa::path(
    post,
    path = "/runs/{run_id}/generate",
    tag = "Runs",
    params(("run_id" = i64, Path, description = "Run id")),
    responses(
        (status = 200, description = "Run with generation results", body = Run),
        (status = 404, description = "Run not found or expired"),
        (status = 409, description = "Run is already generating")
    )
)]
pub async fn generate_run(
    State(runs): State<RunService>,
    Path(run_id): Path<i64>,
) -> Result<Json<Run>, ApiError> {
    Ok(Json(runs.generate(run_id).await?))
}

/// POST /runs/{run_id}/cancel - Cancel in-flight generation
#[utoipa::path(
    post,
    path = "/runs/{run_id}/cancel",
    tag = "Runs",
    params(("run_id" = i64, Path, description = "Run id")),
    responses(
        (status = 200, description = "Cancellation result", body = CancelRunResponse),
        (status = 404, description = "Run not found or expired")
    )
)]
pub async fn cancel_run(
    State(runs): State<RunService>,
    Path(run_id): Path<i64>,
) -> Result<Json<CancelRunResponse>, ApiError> {
    let cancelled = runs.cancel(run_id).await?;
    Ok(Json(CancelRunResponse { cancelled }))
}

/// POST /runs/{run_id}/apply/{product_id} - Apply one product of a run
#[utoipa::path(
    post,
    path = "/runs/{run_id}/apply/{product_id}",
    tag = "Runs",
    params(
        ("run_id" = i64, Path, description = "Run id"),
        ("product_id" = String, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Product applied", body = RunProduct),
        (status = 400, description = "Nothing to apply or update rejected by Shopify"),
        (status = 404, description = "Run or product not found"),
        (status = 409, description = "Run is generating or product already applied")
    )
)]
pub async fn apply_run_product(
    State(runs): State<RunService>,
    Path((run_id, product_id)): Path<(i64, String)>,
) -> Result<Json<RunProduct>, ApiError> {
    Ok(Json(runs.apply_product(run_id, &product_id).await?))
}

/// POST /runs/{run_id}/apply-all - Apply every not-applied product of a run
#[utoipa::path(
    post,
    path = "/runs/{run_id}/apply-all",
    tag = "Runs",
    params(("run_id" = i64, Path, description = "Run id")),
    responses(
        (status = 200, description = "Per-product outcomes and summary", body = BulkApplyReport),
        (status = 404, description = "Run not found or expired"),
        (status = 409, description = "Run is generating")
    )
)]
pub async fn apply_run_all(
    State(runs): State<RunService>,
    Path(run_id): Path<i64>,
) -> Result<Json<BulkApplyReport>, ApiError> {
    Ok(Json(runs.apply_all(run_id).await?))
}
