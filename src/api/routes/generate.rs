//! Stateless generation route.

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
use crate::models::flow::DEFAULT_RUN_PROMPT;
use crate::models::{DestinationSet, GenerationResult, Product};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub destinations: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateResponse {
    pub results: Vec<GenerationResult>,
}

/// Create the generation router
pub fn generate_router() -> Router<AppState> {
    Router::new().route("/generate", post(generate))
}

/// POST /generate - Generate content for each product
#[utoipa::path(
    post,
    path = "/generate",
    tag = "Generation",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "One result per product", body = GenerateResponse),
        (status = 400, description = "No products or no usable destinations")
    )
)]
pub async fn generate(
    State(state): State<AppState>,
    request: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) = request?;
    let destinations = DestinationSet::parse(&request.destinations);
    let prompt = if request.prompt.trim().is_empty() {
        DEFAULT_RUN_PROMPT
    } else {
        request.prompt.as_str()
    };

    let results = state
        .batch
        .run(
            request.products,
            prompt,
            &destinations,
            state.shutdown.child_token(),
        )
        .await?;
    Ok(Json(GenerateResponse { results }))
}
