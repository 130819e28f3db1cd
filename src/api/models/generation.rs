use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::destination::{Destination, DestinationSet};
use super::product::Product;

/// Outcome of one product's generation attempt.
///
/// Either every requested text destination is populated or `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    #[serde(flatten)]
    pub product: Product,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_seo_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_seo_description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GenerationResult {
    /// Product with nothing generated yet.
    pub fn pending(product: Product) -> Self {
        Self {
            product,
            generated_title: None,
            generated_description: None,
            generated_seo_title: None,
            generated_seo_description: None,
            error: None,
        }
    }

    /// Copy one generated text into every requested destination slot.
    pub fn succeeded(product: Product, destinations: &DestinationSet, text: &str) -> Self {
        let mut result = Self::pending(product);
        for destination in destinations.iter() {
            if let Some(slot) = result.slot_mut(destination) {
                *slot = Some(text.to_string());
            }
        }
        result
    }

    pub fn failed(product: Product, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::pending(product)
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn generated(&self, destination: Destination) -> Option<&str> {
        let value = match destination {
            Destination::ProductTitle => &self.generated_title,
            Destination::ProductDescription => &self.generated_description,
            Destination::SeoTitle => &self.generated_seo_title,
            Destination::SeoDescription => &self.generated_seo_description,
            _ => return None,
        };
        value.as_deref()
    }

    fn slot_mut(&mut self, destination: Destination) -> Option<&mut Option<String>> {
        match destination {
            Destination::ProductTitle => Some(&mut self.generated_title),
            Destination::ProductDescription => Some(&mut self.generated_description),
            Destination::SeoTitle => Some(&mut self.generated_seo_title),
            Destination::SeoDescription => Some(&mut self.generated_seo_description),
            _ => None,
        }
    }
}
