//! Services module - catalog access, generation, apply and flow/run bookkeeping.

pub mod ai_service;
pub mod apply_service;
pub mod catalog_service;
pub mod filter_service;
pub mod flow_service;
pub mod generation_service;
pub mod run_service;

// Re-export for convenience
pub use ai_service::{GenerationApi, GenerationError, GenerationRequest, OpenAIGenerator};
pub use apply_service::{ApplyError, ApplyReconciler, BulkApplyReport};
pub use catalog_service::{CatalogApi, CatalogError, CatalogReader, ShopifyAdminClient};
pub use filter_service::{FilterService, ProductFilter};
pub use flow_service::{FlowError, FlowService};
pub use generation_service::{BatchConfig, BatchError, BatchRunner};
pub use run_service::{RunError, RunService};
