//! In-process fakes for the catalog and generation APIs shared by the test targets.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flows_api::models::{Product, UserError};
use flows_api::routes::{AppConfig, AppState};
use flows_api::services::ai_service::{GenerationApi, GenerationError, GenerationRequest};
use flows_api::services::catalog_service::{
    CatalogApi, CatalogError, ProductPage, ProductUpdateInput, ProductUpdateOutcome,
    UpdatedProduct,
};
use flows_api::services::BatchConfig;
use flows_api::storage::InMemoryStore;

pub fn product(id: &str, title: &str) -> Product {
    let mut product = Product::new(id, title);
    product.vendor = "Acme".to_string();
    product.product_type = "Mugs".to_string();
    product
}

pub fn products(count: usize) -> Vec<Product> {
    (1..=count)
        .map(|i| product(&i.to_string(), &format!("Product {i}")))
        .collect()
}

/// Catalog serving a fixed product list, paged by offset cursors.
#[derive(Default)]
pub struct FakeCatalog {
    pub products: Vec<Product>,
    /// 1-based page number that fails
    pub fail_page: Option<usize>,
    /// Product gids whose update is rejected with a user error
    pub rejected: HashSet<String>,
    pub page_requests: AtomicUsize,
    pub page_sizes: Mutex<Vec<u32>>,
    pub updates: Mutex<Vec<ProductUpdateInput>>,
    /// Latency of every product update
    pub update_delay: Duration,
}

impl FakeCatalog {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products,
            ..Default::default()
        }
    }

    pub fn reject(mut self, product_id: &str) -> Self {
        self.rejected
            .insert(format!("gid://shopify/Product/{product_id}"));
        self
    }

    pub fn with_update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = delay;
        self
    }

    pub fn updates(&self) -> Vec<ProductUpdateInput> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn fetch_products_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<ProductPage, CatalogError> {
        let page = self.page_requests.fetch_add(1, Ordering::SeqCst) + 1;
        self.page_sizes.lock().unwrap().push(page_size);
        if self.fail_page == Some(page) {
            return Err(CatalogError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }

        let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + page_size as usize).min(self.products.len());
        Ok(ProductPage {
            products: self.products[start..end].to_vec(),
            has_next_page: end < self.products.len(),
            end_cursor: Some(end.to_string()),
        })
    }

    async fn update_product(
        &self,
        input: &ProductUpdateInput,
    ) -> Result<ProductUpdateOutcome, CatalogError> {
        self.updates.lock().unwrap().push(input.clone());
        tokio::time::sleep(self.update_delay).await;
        if self.rejected.contains(&input.id) {
            return Ok(ProductUpdateOutcome {
                product: None,
                user_errors: vec![UserError {
                    field: Some(vec!["title".to_string()]),
                    message: "Title is too long".to_string(),
                }],
            });
        }
        Ok(ProductUpdateOutcome {
            product: Some(UpdatedProduct {
                id: input.id.clone(),
                title: input.title.clone().unwrap_or_else(|| "Existing".to_string()),
                description_html: input.description_html.clone(),
            }),
            user_errors: Vec::new(),
        })
    }
}

/// Generator returning fixed text, with per-product failures and hangs.
pub struct FakeGenerator {
    pub text: String,
    pub delay: Duration,
    pub failing: HashSet<String>,
    pub hanging: HashSet<String>,
    pub panicking: HashSet<String>,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub requests: Mutex<HashMap<String, GenerationRequest>>,
}

impl FakeGenerator {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            delay: Duration::from_millis(0),
            failing: HashSet::new(),
            hanging: HashSet::new(),
            panicking: HashSet::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, product_id: &str) -> Self {
        self.failing.insert(product_id.to_string());
        self
    }

    pub fn hanging(mut self, product_id: &str) -> Self {
        self.hanging.insert(product_id.to_string());
        self
    }

    pub fn panicking(mut self, product_id: &str) -> Self {
        self.panicking.insert(product_id.to_string());
        self
    }

    pub fn request_for(&self, product_id: &str) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().get(product_id).cloned()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GenerationApi for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .insert(request.product_id.clone(), request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if self.panicking.contains(&request.product_id) {
            panic!("generator crashed on product {}", request.product_id);
        }
        if self.hanging.contains(&request.product_id) {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(self.delay).await;

        if self.failing.contains(&request.product_id) {
            return Err(GenerationError::Status {
                status: 500,
                body: "model overloaded".to_string(),
            });
        }
        Ok(self.text.clone())
    }
}

/// App state over the fakes with in-memory storage.
pub fn test_state(catalog: Arc<FakeCatalog>, generator: Arc<FakeGenerator>) -> AppState {
    let config = AppConfig {
        batch: BatchConfig {
            concurrency: 4,
            timeout: Duration::from_secs(5),
        },
        ..AppConfig::default()
    };
    AppState::with_components(
        config,
        catalog,
        generator,
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryStore::new()),
    )
}
