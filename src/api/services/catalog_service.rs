//! Catalog service: product reads and product updates against the Shopify Admin GraphQL API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;
use utoipa::ToSchema;

use super::filter_service::{FilterService, ProductFilter};
use crate::models::product::{
    MAX_COLLECTIONS_PER_PRODUCT, normalize_product_type, short_id,
};
use crate::models::{CollectionRef, Facets, Product, UserError};

/// Largest page the catalog API serves.
pub const PAGE_SIZE: u32 = 250;

pub const DEFAULT_API_VERSION: &str = "2024-10";

const PRODUCTS_QUERY: &str = r#"
query fetchProducts($first: Int!, $cursor: String) {
  products(first: $first, after: $cursor) {
    edges {
      cursor
      node {
        id
        title
        vendor
        productType
        tags
        featuredImage { url }
        collections(first: 5) {
          edges { node { id title } }
        }
      }
    }
    pageInfo {
      hasNextPage
      endCursor
    }
  }
}
"#;

const PRODUCT_UPDATE_MUTATION: &str = r#"
mutation productUpdate($input: ProductInput!) {
  productUpdate(input: $input) {
    product {
      id
      title
      descriptionHtml
    }
    userErrors {
      field
      message
    }
  }
}
"#;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog API not configured: {0}")]
    NotConfigured(&'static str),
    #[error("Invalid catalog endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Catalog API returned error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Catalog GraphQL errors: {}", .0.join("; "))]
    GraphQL(Vec<String>),
    #[error("Catalog response missing {0}")]
    MissingData(&'static str),
}

/// One page of normalized products.
#[derive(Debug, Clone, Default)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Sparse product update. Absent fields are left untouched by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdateInput {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo: Option<SeoInput>,
}

impl ProductUpdateInput {
    /// True when the update would not change any field.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description_html.is_none() && self.seo.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SeoInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Product as returned by the update mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedProduct {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description_html: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdateOutcome {
    pub product: Option<UpdatedProduct>,
    pub user_errors: Vec<UserError>,
}

/// Outbound catalog operations.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch one page of products after `cursor`
    async fn fetch_products_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<ProductPage, CatalogError>;

    /// Apply a sparse update to one product
    async fn update_product(
        &self,
        input: &ProductUpdateInput,
    ) -> Result<ProductUpdateOutcome, CatalogError>;
}

// ---------------------------------------------------------------------------
// GraphQL wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQLErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductConnection {
    edges: Vec<Edge<ProductNode>>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: ProductConnection,
}

#[derive(Debug, Deserialize)]
struct ImageNode {
    url: String,
}

#[derive(Debug, Deserialize)]
struct CollectionNode {
    id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductNode {
    id: String,
    title: String,
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default)]
    product_type: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    featured_image: Option<ImageNode>,
    #[serde(default)]
    collections: Option<Connection<CollectionNode>>,
}

impl ProductNode {
    /// Normalize a catalog node into a product snapshot.
    fn into_product(self) -> Product {
        let collections = self
            .collections
            .map(|c| c.edges)
            .unwrap_or_default()
            .into_iter()
            .take(MAX_COLLECTIONS_PER_PRODUCT)
            .map(|edge| CollectionRef {
                id: short_id(&edge.node.id).to_string(),
                title: edge.node.title,
            })
            .collect();

        Product {
            id: short_id(&self.id).to_string(),
            title: self.title,
            vendor: self.vendor.unwrap_or_default(),
            product_type: normalize_product_type(self.product_type.as_deref()),
            tags: self.tags,
            featured_image: self.featured_image.map(|i| i.url),
            collections,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductUpdateData {
    product_update: ProductUpdatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductUpdatePayload {
    product: Option<UpdatedProduct>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

// ---------------------------------------------------------------------------
// Shopify Admin client
// ---------------------------------------------------------------------------

/// Admin GraphQL client for one shop.
#[derive(Clone)]
pub struct ShopifyAdminClient {
    http_client: reqwest::Client,
    endpoint: Option<Url>,
    access_token: Option<String>,
}

impl ShopifyAdminClient {
    /// Build a client for `shop` (e.g. `my-store.myshopify.com`).
    ///
    /// A missing shop or token yields a client whose calls fail with
    /// [`CatalogError::NotConfigured`].
    pub fn new(
        shop: Option<&str>,
        api_version: &str,
        access_token: Option<String>,
    ) -> Result<Self, CatalogError> {
        let endpoint = shop
            .map(|s| {
                let host = s
                    .trim()
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .trim_end_matches('/');
                Url::parse(&format!("https://{host}/admin/api/{api_version}/graphql.json"))
            })
            .transpose()?;

        Ok(Self {
            http_client: reqwest::Client::new(),
            endpoint,
            access_token,
        })
    }

    /// Client against an explicit GraphQL endpoint.
    pub fn with_endpoint(endpoint: Url, access_token: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            endpoint: Some(endpoint),
            access_token: Some(access_token.into()),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, CatalogError> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or(CatalogError::NotConfigured("SHOPIFY_SHOP"))?;
        let access_token = self
            .access_token
            .as_deref()
            .ok_or(CatalogError::NotConfigured("SHOPIFY_ACCESS_TOKEN"))?;

        let response = self
            .http_client
            .post(endpoint.clone())
            .header("X-Shopify-Access-Token", access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status { status, body });
        }

        let payload: GraphQLResponse<T> = response.json().await?;
        if !payload.errors.is_empty() {
            return Err(CatalogError::GraphQL(
                payload.errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        payload.data.ok_or(CatalogError::MissingData("data"))
    }
}

#[async_trait]
impl CatalogApi for ShopifyAdminClient {
    async fn fetch_products_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<ProductPage, CatalogError> {
        let data: ProductsData = self
            .execute(
                PRODUCTS_QUERY,
                json!({ "first": page_size, "cursor": cursor }),
            )
            .await?;

        let connection = data.products;
        Ok(ProductPage {
            products: connection
                .edges
                .into_iter()
                .map(|edge| edge.node.into_product())
                .collect(),
            has_next_page: connection.page_info.has_next_page,
            end_cursor: connection.page_info.end_cursor,
        })
    }

    async fn update_product(
        &self,
        input: &ProductUpdateInput,
    ) -> Result<ProductUpdateOutcome, CatalogError> {
        let data: ProductUpdateData = self
            .execute(PRODUCT_UPDATE_MUTATION, json!({ "input": input }))
            .await?;

        Ok(ProductUpdateOutcome {
            product: data.product_update.product,
            user_errors: data.product_update.user_errors,
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog reader
// ---------------------------------------------------------------------------

/// Full catalog snapshot with its facets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub products: Vec<Product>,
    #[serde(flatten)]
    pub facets: Facets,
}

/// Reads the whole catalog page by page.
#[derive(Clone)]
pub struct CatalogReader {
    api: Arc<dyn CatalogApi>,
    page_size: u32,
}

impl CatalogReader {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            api,
            page_size: PAGE_SIZE,
        }
    }

    pub fn api(&self) -> &Arc<dyn CatalogApi> {
        &self.api
    }

    /// Fetch every product, concatenated in page order.
    ///
    /// Any failing page aborts the read; no partial catalog is returned.
    pub async fn fetch_all(&self) -> Result<Vec<Product>, CatalogError> {
        let mut products = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .api
                .fetch_products_page(cursor.as_deref(), self.page_size)
                .await
                .inspect_err(|e| error!(pages_read = pages, "Catalog page fetch failed: {}", e))?;
            pages += 1;
            debug!(page = pages, count = page.products.len(), "Catalog page fetched");
            products.extend(page.products);

            if !page.has_next_page {
                break;
            }
            cursor = Some(
                page.end_cursor
                    .ok_or(CatalogError::MissingData("pageInfo.endCursor"))?,
            );
        }

        info!(pages, products = products.len(), "Catalog read complete");
        Ok(products)
    }

    /// Fetch the catalog, derive facets over all of it, then apply `filter`.
    pub async fn load(&self, filter: &ProductFilter) -> Result<CatalogSnapshot, CatalogError> {
        let products = self.fetch_all().await?;
        let facets = Facets::derive(&products);
        let products = FilterService::filter_products(&products, filter)
            .into_iter()
            .cloned()
            .collect();
        Ok(CatalogSnapshot { products, facets })
    }
}
