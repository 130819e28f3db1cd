//! API routes module - organizes all route handlers.
//!
//! Everything the embedded admin app calls lives under /app.

pub mod app_state;
pub mod apply;
pub mod catalog;
pub mod error;
pub mod flows;
pub mod generate;
pub mod openapi;
pub mod runs;

use axum::{Router, response::Json, routing::get};
use serde_json::{Value, json};

pub use app_state::{AppConfig, AppState};
pub use error::ApiError;

/// Create the main API router combining all route modules
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .merge(catalog::catalog_router())
        .merge(generate::generate_router())
        .merge(apply::apply_router())
        .merge(flows::flows_router())
        .merge(runs::runs_router())
        // OpenAPI documentation endpoints
        .merge(openapi::openapi_router())
    // Note: State is applied by callers who need it (e.g., TestServer)
}

/// Full application: health check plus the API nested under /app.
pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/app", create_api_router())
        .with_state(app_state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "flows-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
