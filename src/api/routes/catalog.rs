//! Catalog routes.

use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::get,
};

use super::app_state::AppState;
use super::error::ApiError;
use crate::services::catalog_service::CatalogSnapshot;
use crate::services::filter_service::{ProductFilter, ProductFilterQuery};

/// Create the catalog router
pub fn catalog_router() -> Router<AppState> {
    Router::new().route("/products", get(list_products))
}

/// GET /products - Full catalog snapshot with facets, optionally filtered
#[utoipa::path(
    get,
    path = "/products",
    tag = "Catalog",
    params(ProductFilterQuery),
    responses(
        (status = 200, description = "Products and filter facets", body = CatalogSnapshot),
        (status = 503, description = "Catalog credentials not configured"),
        (status = 500, description = "Catalog read failed")
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductFilterQuery>,
) -> Result<Json<CatalogSnapshot>, ApiError> {
    let filter = ProductFilter::from(query);
    let snapshot = state.catalog.load(&filter).await?;
    Ok(Json(snapshot))
}
