use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;

/// Product type used when the catalog reports an empty or blank one.
pub const UNKNOWN_PRODUCT_TYPE: &str = "Unknown";

/// Number of collections kept per product snapshot.
pub const MAX_COLLECTIONS_PER_PRODUCT: usize = 5;

const PRODUCT_GID_PREFIX: &str = "gid://shopify/Product/";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct CollectionRef {
    pub id: String,
    pub title: String,
}

/// Product snapshot taken when the catalog was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub collections: Vec<CollectionRef>,
}

impl Product {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            vendor: String::new(),
            product_type: String::new(),
            tags: Vec::new(),
            featured_image: None,
            collections: Vec::new(),
        }
    }
}

/// Strip the namespace from an opaque catalog id (`gid://shopify/Product/42` -> `42`).
pub fn short_id(gid: &str) -> &str {
    gid.rsplit('/').next().unwrap_or(gid)
}

/// Inverse of [`short_id`] for products. Ids that already carry a namespace pass through.
pub fn product_gid(id: &str) -> String {
    if id.starts_with("gid://") {
        id.to_string()
    } else {
        format!("{PRODUCT_GID_PREFIX}{id}")
    }
}

pub fn normalize_product_type(product_type: Option<&str>) -> String {
    match product_type.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => UNKNOWN_PRODUCT_TYPE.to_string(),
    }
}

/// Field-level validation error reported by the catalog on a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// Filter dimensions derived from a full catalog snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    pub vendors: Vec<String>,
    pub product_types: Vec<String>,
    pub tags: Vec<String>,
    pub collections: Vec<CollectionRef>,
}

impl Facets {
    /// De-duplicate each dimension across all products, keeping first-seen order.
    ///
    /// Blank values are dropped. Collections are keyed by id; when titles
    /// diverge for one id the last one seen wins, at the first one's position.
    pub fn derive(products: &[Product]) -> Self {
        let mut vendors = UniqueStrings::default();
        let mut product_types = UniqueStrings::default();
        let mut tags = UniqueStrings::default();
        let mut collections: Vec<CollectionRef> = Vec::new();
        let mut collection_index: HashMap<&str, usize> = HashMap::new();

        for product in products {
            vendors.push(&product.vendor);
            product_types.push(&product.product_type);
            for tag in &product.tags {
                tags.push(tag);
            }
            for collection in &product.collections {
                if collection.id.trim().is_empty() {
                    continue;
                }
                match collection_index.get(collection.id.as_str()) {
                    Some(&i) => collections[i].title = collection.title.clone(),
                    None => {
                        collection_index.insert(&collection.id, collections.len());
                        collections.push(collection.clone());
                    }
                }
            }
        }

        Self {
            vendors: vendors.values,
            product_types: product_types.values,
            tags: tags.values,
            collections,
        }
    }
}

#[derive(Default)]
struct UniqueStrings {
    seen: HashSet<String>,
    values: Vec<String>,
}

impl UniqueStrings {
    fn push(&mut self, value: &str) {
        if value.trim().is_empty() {
            return;
        }
        if self.seen.insert(value.to_string()) {
            self.values.push(value.to_string());
        }
    }
}
