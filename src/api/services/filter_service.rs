//! Filter service for narrowing a catalog snapshot by facet selections.

use serde::Deserialize;
use std::collections::HashSet;
use utoipa::IntoParams;

use crate::models::Product;

/// Facet selections. An empty selection matches every product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub vendors: Vec<String>,
    pub product_types: Vec<String>,
    pub tags: Vec<String>,
    pub collections: Vec<String>,
}

impl ProductFilter {
    pub fn is_empty(&self) -> bool {
        self.search.as_deref().is_none_or(|s| s.trim().is_empty())
            && self.vendors.is_empty()
            && self.product_types.is_empty()
            && self.tags.is_empty()
            && self.collections.is_empty()
    }
}

/// Query-string form of [`ProductFilter`]: list values are comma separated.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductFilterQuery {
    /// Case-insensitive substring of the product title
    pub search: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub tag: Option<String>,
    /// Collection ids
    pub collection: Option<String>,
}

impl From<ProductFilterQuery> for ProductFilter {
    fn from(query: ProductFilterQuery) -> Self {
        Self {
            search: query.search,
            vendors: split_list(query.vendor.as_deref()),
            product_types: split_list(query.product_type.as_deref()),
            tags: split_list(query.tag.as_deref()),
            collections: split_list(query.collection.as_deref()),
        }
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Service for filtering products by facet selections.
pub struct FilterService;

impl FilterService {
    /// Products matching every active selection, in catalog order.
    ///
    /// Vendor and product type match exactly; tags and collections match if
    /// the product carries any of the selected values.
    pub fn filter_products<'a>(products: &'a [Product], filter: &ProductFilter) -> Vec<&'a Product> {
        let search = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let vendors: HashSet<&str> = filter.vendors.iter().map(String::as_str).collect();
        let types: HashSet<&str> = filter.product_types.iter().map(String::as_str).collect();
        let tags: HashSet<&str> = filter.tags.iter().map(String::as_str).collect();
        let collections: HashSet<&str> = filter.collections.iter().map(String::as_str).collect();

        products
            .iter()
            .filter(|p| {
                search
                    .as_deref()
                    .is_none_or(|s| p.title.to_lowercase().contains(s))
            })
            .filter(|p| vendors.is_empty() || vendors.contains(p.vendor.as_str()))
            .filter(|p| types.is_empty() || types.contains(p.product_type.as_str()))
            .filter(|p| tags.is_empty() || p.tags.iter().any(|t| tags.contains(t.as_str())))
            .filter(|p| {
                collections.is_empty()
                    || p.collections
                        .iter()
                        .any(|c| collections.contains(c.id.as_str()))
            })
            .collect()
    }
}
