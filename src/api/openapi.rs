//! OpenAPI specification definition.
//!
//! Aggregates all route handlers and schemas for OpenAPI documentation generation.

use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Catalog
        crate::routes::catalog::list_products,
        // Generation
        crate::routes::generate::generate,
        // Apply
        crate::routes::apply::apply_single,
        crate::routes::apply::apply_all,
        // Flows
        crate::routes::flows::list_flows,
        crate::routes::flows::create_flow,
        crate::routes::flows::get_flow,
        crate::routes::flows::update_flow,
        crate::routes::flows::delete_flow,
        crate::routes::flows::list_templates,
        crate::routes::flows::create_from_template,
        crate::routes::flows::flow_options,
        // Runs
        crate::routes::runs::create_run,
        crate::routes::runs::get_run,
        crate::routes::runs::delete_run,
        crate::routes::runs::generate_run,
        crate::routes::runs::cancel_run,
        crate::routes::runs::apply_run_product,
        crate::routes::runs::apply_run_all,
        // OpenAPI
        crate::routes::openapi::serve_openapi_json,
    ),
    components(schemas(
        crate::models::Product,
        crate::models::CollectionRef,
        crate::models::Facets,
        crate::models::UserError,
        crate::models::Flow,
        crate::models::FlowDraft,
        crate::models::SelectionType,
        crate::models::GenerationResult,
        crate::models::Run,
        crate::models::RunProduct,
        crate::models::RunState,
        crate::models::ApplyStatus,
        crate::services::catalog_service::CatalogSnapshot,
        crate::services::catalog_service::UpdatedProduct,
        crate::services::apply_service::BulkApplyReport,
        crate::services::apply_service::ProductApplyOutcome,
        crate::services::apply_service::ApplyOutcomeStatus,
        crate::services::apply_service::ApplySummary,
        crate::services::flow_service::FlowOptions,
        crate::routes::generate::GenerateRequest,
        crate::routes::generate::GenerateResponse,
        crate::routes::apply::ApplySingleRequest,
        crate::routes::apply::ApplySingleResponse,
        crate::routes::apply::ApplyAllRequest,
        crate::routes::runs::CreateRunRequest,
        crate::routes::runs::CancelRunResponse,
    )),
    modifiers(&VersionAddon),
    tags(
        (name = "Catalog", description = "Product catalog snapshot and filter facets"),
        (name = "Generation", description = "AI content generation for selected products"),
        (name = "Apply", description = "Write generated content back to Shopify"),
        (name = "Flows", description = "Flow definitions and templates"),
        (name = "Runs", description = "Flow runs with per-product apply status"),
        (name = "OpenAPI", description = "OpenAPI specification"),
    ),
    info(
        title = "Flows API",
        description = "Content generation flows for Shopify products",
        version = "0.1.0"
    ),
    servers(
        (url = "http://localhost:8081/app", description = "Local development server")
    )
)]
pub struct ApiDoc;

struct VersionAddon;

impl Modify for VersionAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        // Update version to match Cargo.toml version
        openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    }
}
