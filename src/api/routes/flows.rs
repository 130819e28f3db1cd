//! Flow routes: CRUD, built-in templates and the field vocabulary.

use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use std::sync::Arc;

use super::app_state::AppState;
use super::error::ApiError;
use crate::models::{Flow, FlowDraft, FlowTemplate};
use crate::services::FlowService;
use crate::services::flow_service::FlowOptions;

/// Create the flows router
pub fn flows_router() -> Router<AppState> {
    Router::new()
        .route("/flows", get(list_flows).post(create_flow))
        .route("/flows/templates", get(list_templates))
        .route("/flows/templates/{template_id}", post(create_from_template))
        .route("/flows/options", get(flow_options))
        .route(
            "/flows/{id}",
            get(get_flow).put(update_flow).delete(delete_flow),
        )
}

/// GET /flows - All flows in creation order
#[utoipa::path(
    get,
    path = "/flows",
    tag = "Flows",
    responses((status = 200, description = "Flows", body = [Flow]))
)]
pub async fn list_flows(State(flows): State<Arc<FlowService>>) -> Result<Json<Vec<Flow>>, ApiError> {
    Ok(Json(flows.list_flows().await?))
}

/// POST /flows - Create a flow
#[utoipa::path(
    post,
    path = "/flows",
    tag = "Flows",
    request_body = FlowDraft,
    responses(
        (status = 201, description = "Flow created", body = Flow),
        (status = 400, description = "Missing source fields or destinations")
    )
)]
pub async fn create_flow(
    State(flows): State<Arc<FlowService>>,
    draft: Result<Json<FlowDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Flow>), ApiError> {
    let Json(draft) = draft?;
    let flow = flows.create_flow(draft).await?;
    Ok((StatusCode::CREATED, Json(flow)))
}

/// GET /flows/{id} - Get one flow
#[utoipa::path(
    get,
    path = "/flows/{id}",
    tag = "Flows",
    params(("id" = String, Path, description = "Flow id")),
    responses(
        (status = 200, description = "Flow", body = Flow),
        (status = 404, description = "Flow not found")
    )
)]
pub async fn get_flow(
    State(flows): State<Arc<FlowService>>,
    Path(id): Path<String>,
) -> Result<Json<Flow>, ApiError> {
    Ok(Json(flows.get_flow(&id).await?))
}

/// PUT /flows/{id} - Replace a flow's editable fields
#[utoipa::path(
    put,
    path = "/flows/{id}",
    tag = "Flows",
    params(("id" = String, Path, description = "Flow id")),
    request_body = FlowDraft,
    responses(
        (status = 200, description = "Flow updated", body = Flow),
        (status = 400, description = "Missing source fields or destinations"),
        (status = 404, description = "Flow not found")
    )
)]
pub async fn update_flow(
    State(flows): State<Arc<FlowService>>,
    Path(id): Path<String>,
    draft: Result<Json<FlowDraft>, JsonRejection>,
) -> Result<Json<Flow>, ApiError> {
    let Json(draft) = draft?;
    Ok(Json(flows.update_flow(&id, draft).await?))
}

/// DELETE /flows/{id} - Delete a flow
#[utoipa::path(
    delete,
    path = "/flows/{id}",
    tag = "Flows",
    params(("id" = String, Path, description = "Flow id")),
    responses(
        (status = 204, description = "Flow deleted"),
        (status = 404, description = "Flow not found")
    )
)]
pub async fn delete_flow(
    State(flows): State<Arc<FlowService>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    flows.delete_flow(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /flows/templates - Built-in flow presets
#[utoipa::path(
    get,
    path = "/flows/templates",
    tag = "Flows",
    responses((status = 200, description = "Flow templates", body = Object))
)]
pub async fn list_templates(
    State(flows): State<Arc<FlowService>>,
) -> Json<&'static [FlowTemplate]> {
    Json(flows.templates())
}

/// POST /flows/templates/{template_id} - Create a flow from a preset
#[utoipa::path(
    post,
    path = "/flows/templates/{template_id}",
    tag = "Flows",
    params(("template_id" = String, Path, description = "Template id")),
    responses(
        (status = 201, description = "Flow created", body = Flow),
        (status = 404, description = "Template not found")
    )
)]
pub async fn create_from_template(
    State(flows): State<Arc<FlowService>>,
    Path(template_id): Path<String>,
) -> Result<(StatusCode, Json<Flow>), ApiError> {
    let flow = flows.create_from_template(&template_id).await?;
    Ok((StatusCode::CREATED, Json(flow)))
}

/// GET /flows/options - Source fields and destinations a flow may use
#[utoipa::path(
    get,
    path = "/flows/options",
    tag = "Flows",
    responses((status = 200, description = "Field vocabulary", body = FlowOptions))
)]
pub async fn flow_options(State(flows): State<Arc<FlowService>>) -> Json<FlowOptions> {
    Json(flows.options())
}
