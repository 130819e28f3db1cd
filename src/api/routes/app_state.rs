//! Application state management.
//!
//! Defines the AppConfig read from the environment at startup and the AppState
//! holding the catalog reader, generation runner, apply reconciler and the
//! flow and run services shared by every handler.

use axum::extract::FromRef;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::services::ai_service::{DEFAULT_MODEL, DEFAULT_SERVICE_URL};
use crate::services::catalog_service::DEFAULT_API_VERSION;
use crate::services::generation_service::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT};
use crate::services::{
    ApplyReconciler, BatchConfig, BatchRunner, CatalogApi, CatalogError, CatalogReader,
    FlowService, GenerationApi, OpenAIGenerator, RunService, ShopifyAdminClient,
};
use crate::storage::{FileStore, InMemoryStore, KeyValueStore, RunSessionStore, StorageError};

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(86_400);

/// Startup configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub shopify_shop: Option<String>,
    pub shopify_access_token: Option<String>,
    pub shopify_api_version: String,
    pub openai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_service_url: String,
    pub batch: BatchConfig,
    /// Directory for durable flow storage; in memory when unset
    pub data_dir: Option<PathBuf>,
    pub session_ttl: Duration,
    /// Origins allowed by CORS; any origin when empty
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            shopify_shop: None,
            shopify_access_token: None,
            shopify_api_version: DEFAULT_API_VERSION.to_string(),
            openai_api_key: None,
            ai_model: DEFAULT_MODEL.to_string(),
            ai_service_url: DEFAULT_SERVICE_URL.to_string(),
            batch: BatchConfig::default(),
            data_dir: None,
            session_ttl: DEFAULT_SESSION_TTL,
            cors_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Read configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parsed = |key: &str| var(key).and_then(|v| v.parse::<u64>().ok());

        Self {
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            shopify_shop: var("SHOPIFY_SHOP"),
            shopify_access_token: var("SHOPIFY_ACCESS_TOKEN"),
            shopify_api_version: var("SHOPIFY_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            openai_api_key: var("OPENAI_API_KEY"),
            ai_model: var("AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ai_service_url: var("AI_SERVICE_URL")
                .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string()),
            batch: BatchConfig {
                concurrency: parsed("GENERATION_CONCURRENCY")
                    .map(|n| n.max(1) as usize)
                    .unwrap_or(DEFAULT_CONCURRENCY),
                timeout: parsed("GENERATION_TIMEOUT_SECS")
                    .map(|secs| Duration::from_secs(secs.max(1)))
                    .unwrap_or(DEFAULT_TIMEOUT),
            },
            data_dir: var("FLOWS_DATA_DIR").map(PathBuf::from),
            session_ttl: parsed("RUN_SESSION_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SESSION_TTL),
            cors_origins: var("CORS_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Errors raised while wiring up the application state.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Application state shared across all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: CatalogReader,
    pub batch: Arc<BatchRunner>,
    pub reconciler: Arc<ApplyReconciler>,
    pub flows: Arc<FlowService>,
    pub runs: RunService,
    /// Cancelled on shutdown; parent of every generation token
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the production clients and storage from configuration.
    pub async fn new(config: AppConfig) -> Result<Self, StartupError> {
        let catalog: Arc<dyn CatalogApi> = Arc::new(ShopifyAdminClient::new(
            config.shopify_shop.as_deref(),
            &config.shopify_api_version,
            config.shopify_access_token.clone(),
        )?);
        let generator: Arc<dyn GenerationApi> = Arc::new(OpenAIGenerator::new(
            config.openai_api_key.clone(),
            config.ai_model.clone(),
            config.ai_service_url.clone(),
        ));

        let flow_store: Arc<dyn KeyValueStore> = match &config.data_dir {
            Some(dir) => {
                info!("Persisting flows in {:?}", dir);
                Arc::new(FileStore::open(dir).await?)
            }
            None => {
                info!("FLOWS_DATA_DIR not set, flows are kept in memory");
                Arc::new(InMemoryStore::new())
            }
        };
        let session_store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());

        Ok(Self::with_components(
            config,
            catalog,
            generator,
            flow_store,
            session_store,
        ))
    }

    /// Assemble the state from explicit collaborators.
    pub fn with_components(
        config: AppConfig,
        catalog: Arc<dyn CatalogApi>,
        generator: Arc<dyn GenerationApi>,
        flow_store: Arc<dyn KeyValueStore>,
        session_store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let batch = Arc::new(BatchRunner::new(generator, config.batch));
        let reconciler = Arc::new(ApplyReconciler::new(catalog.clone()));
        let flows = Arc::new(FlowService::new(flow_store));
        let runs = RunService::new(
            RunSessionStore::new(session_store),
            flows.clone(),
            batch.clone(),
            reconciler.clone(),
            shutdown.clone(),
        );

        Self {
            config: Arc::new(config),
            catalog: CatalogReader::new(catalog),
            batch,
            reconciler,
            flows,
            runs,
            shutdown,
        }
    }
}

impl FromRef<AppState> for Arc<FlowService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.flows.clone()
    }
}

impl FromRef<AppState> for RunService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.runs.clone()
    }
}
