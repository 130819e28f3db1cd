//! Generation batch runner.
//!
//! Fans one generation call per product out to the AI service with bounded
//! concurrency. Every product gets exactly one result: generated text copied
//! into each requested destination, or an error message. One product's failure
//! never affects another.

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::ai_service::{GenerationApi, GenerationError, GenerationRequest};
use crate::models::{Destination, DestinationSet, GenerationResult, Product};

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("No products provided.")]
    NoProducts,
    #[error("No destinations provided.")]
    NoDestinations,
    #[error("None of the requested destinations can receive generated content.")]
    NoTextDestinations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum generation calls in flight at once.
    pub concurrency: usize,
    /// Limit for a single product's call.
    pub timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Build the generation input for one product.
///
/// Title, vendor and type are included when non-empty, below the flow prompt.
/// The featured image is attached only when a description is requested.
pub fn build_request(
    product: &Product,
    prompt: &str,
    destinations: &DestinationSet,
) -> GenerationRequest {
    let mut sources = Vec::with_capacity(3);
    if !product.title.is_empty() {
        sources.push(format!("Product Title: {}", product.title));
    }
    if !product.vendor.is_empty() {
        sources.push(format!("Vendor: {}", product.vendor));
    }
    if !product.product_type.is_empty() {
        sources.push(format!("Type: {}", product.product_type));
    }

    let image_url = if destinations.contains(Destination::ProductDescription) {
        product.featured_image.clone()
    } else {
        None
    };

    GenerationRequest {
        product_id: product.id.clone(),
        text: format!("{}\n\n{}", prompt, sources.join("\n")),
        image_url,
    }
}

pub struct BatchRunner {
    generator: Arc<dyn GenerationApi>,
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(generator: Arc<dyn GenerationApi>, config: BatchConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> BatchConfig {
        self.config
    }

    /// Reject batches that cannot produce anything.
    pub fn validate(products: &[Product], destinations: &DestinationSet) -> Result<(), BatchError> {
        if products.is_empty() {
            return Err(BatchError::NoProducts);
        }
        if destinations.is_empty() {
            return Err(BatchError::NoDestinations);
        }
        if !destinations.accepts_generated_text() {
            return Err(BatchError::NoTextDestinations);
        }
        Ok(())
    }

    /// Generate content for every product.
    ///
    /// Results come back in completion order, one per input product. Products
    /// still waiting or in flight when `cancel` fires get a cancellation error.
    #[instrument(skip_all, fields(products = products.len(), concurrency = self.config.concurrency))]
    pub async fn run(
        &self,
        products: Vec<Product>,
        prompt: &str,
        destinations: &DestinationSet,
        cancel: CancellationToken,
    ) -> Result<Vec<GenerationResult>, BatchError> {
        Self::validate(&products, destinations)?;

        let calls: Vec<_> = products
            .into_iter()
            .map(|product| {
                let request = build_request(&product, prompt, destinations);
                self.generate_one(product, request, destinations, cancel.clone())
            })
            .collect();

        let results: Vec<GenerationResult> = stream::iter(calls)
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.is_failed()).count();
        info!(
            succeeded = results.len() - failed,
            failed,
            "Generation batch finished"
        );
        Ok(results)
    }

    async fn generate_one(
        &self,
        product: Product,
        request: GenerationRequest,
        destinations: &DestinationSet,
        cancel: CancellationToken,
    ) -> GenerationResult {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            res = tokio::time::timeout(self.config.timeout, self.generator.generate(&request)) => {
                res.unwrap_or(Err(GenerationError::Timeout(self.config.timeout)))
            }
        };

        match outcome {
            Ok(text) => GenerationResult::succeeded(product, destinations, &text),
            Err(e) => {
                warn!(product_id = %product.id, "Generation failed for product: {}", e);
                GenerationResult::failed(product, e.to_string())
            }
        }
    }
}
