//! HTTP client tests for the Shopify Admin and OpenAI clients against a local mock server.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use url::Url;

use flows_api::services::catalog_service::{
    CatalogApi, CatalogError, CatalogReader, ProductUpdateInput, SeoInput, ShopifyAdminClient,
};
use flows_api::services::{GenerationApi, GenerationError, GenerationRequest, OpenAIGenerator};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

impl Recorded {
    fn push(&self, headers: HeaderMap, body: Value) {
        self.requests.lock().unwrap().push((headers, body));
    }

    fn all(&self) -> Vec<(HeaderMap, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn product_node(id: u32, product_type: Value) -> Value {
    json!({
        "cursor": format!("c{id}"),
        "node": {
            "id": format!("gid://shopify/Product/{id}"),
            "title": format!("Product {id}"),
            "vendor": "Acme",
            "productType": product_type,
            "tags": ["sale"],
            "featuredImage": null,
            "collections": { "edges": [
                { "node": { "id": "gid://shopify/Collection/77", "title": "Summer" } }
            ]}
        }
    })
}

async fn shopify_graphql(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    recorded.push(headers, body.clone());
    let query = body["query"].as_str().unwrap_or_default();

    if query.contains("productUpdate") {
        let input = &body["variables"]["input"];
        if input["title"] == "rejected" {
            return Json(json!({ "data": { "productUpdate": {
                "product": null,
                "userErrors": [{ "field": ["title"], "message": "Title is invalid" }]
            }}}));
        }
        return Json(json!({ "data": { "productUpdate": {
            "product": { "id": input["id"], "title": "Mug", "descriptionHtml": null },
            "userErrors": []
        }}}));
    }

    if body["variables"]["cursor"].is_null() {
        Json(json!({ "data": { "products": {
            "edges": [product_node(1, json!("Mugs")), product_node(2, json!(""))],
            "pageInfo": { "hasNextPage": true, "endCursor": "c2" }
        }}}))
    } else {
        Json(json!({ "data": { "products": {
            "edges": [product_node(3, Value::Null)],
            "pageInfo": { "hasNextPage": false, "endCursor": "c3" }
        }}}))
    }
}

async fn shopify_client() -> (ShopifyAdminClient, Recorded) {
    let recorded = Recorded::default();
    let router = Router::new()
        .route("/admin/api/2024-10/graphql.json", post(shopify_graphql))
        .with_state(recorded.clone());
    let base = spawn(router).await;
    let endpoint = Url::parse(&format!("{base}/admin/api/2024-10/graphql.json")).unwrap();
    (ShopifyAdminClient::with_endpoint(endpoint, "shpat_test"), recorded)
}

#[tokio::test]
async fn test_catalog_reader_follows_cursors_over_http() {
    let (client, recorded) = shopify_client().await;
    let reader = CatalogReader::new(Arc::new(client));

    let products = reader.fetch_all().await.unwrap();

    let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(products[0].product_type, "Mugs");
    assert_eq!(products[1].product_type, "Unknown");
    assert_eq!(products[2].product_type, "Unknown");
    assert_eq!(products[0].collections[0].id, "77");

    let requests = recorded.all();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0["x-shopify-access-token"], "shpat_test");
    assert_eq!(requests[0].1["variables"]["first"], 250);
    assert_eq!(requests[0].1["variables"]["cursor"], Value::Null);
    assert_eq!(requests[1].1["variables"]["cursor"], "c2");
}

#[tokio::test]
async fn test_product_update_reports_product_and_user_errors() {
    let (client, recorded) = shopify_client().await;

    let input = ProductUpdateInput {
        id: "gid://shopify/Product/5".to_string(),
        seo: Some(SeoInput {
            title: Some("Mug".to_string()),
            description: None,
        }),
        ..Default::default()
    };
    let outcome = client.update_product(&input).await.unwrap();
    assert!(outcome.user_errors.is_empty());
    assert_eq!(outcome.product.unwrap().id, "gid://shopify/Product/5");
    assert_eq!(
        recorded.all()[0].1["variables"]["input"],
        json!({ "id": "gid://shopify/Product/5", "seo": { "title": "Mug" } })
    );

    let rejected = ProductUpdateInput {
        id: "gid://shopify/Product/5".to_string(),
        title: Some("rejected".to_string()),
        ..Default::default()
    };
    let outcome = client.update_product(&rejected).await.unwrap();
    assert!(outcome.product.is_none());
    assert_eq!(outcome.user_errors[0].message, "Title is invalid");
    assert_eq!(outcome.user_errors[0].field, Some(vec!["title".to_string()]));
}

#[tokio::test]
async fn test_catalog_errors_are_classified() {
    let router = Router::new()
        .route(
            "/graphql-errors",
            post(|| async { Json(json!({ "errors": [{ "message": "Throttled" }] })) }),
        )
        .route(
            "/unavailable",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
    let base = spawn(router).await;

    let client = ShopifyAdminClient::with_endpoint(
        Url::parse(&format!("{base}/graphql-errors")).unwrap(),
        "token",
    );
    match client.fetch_products_page(None, 250).await.unwrap_err() {
        CatalogError::GraphQL(messages) => assert_eq!(messages, vec!["Throttled".to_string()]),
        other => panic!("unexpected error: {other}"),
    }

    let client = ShopifyAdminClient::with_endpoint(
        Url::parse(&format!("{base}/unavailable")).unwrap(),
        "token",
    );
    match client.fetch_products_page(None, 250).await.unwrap_err() {
        CatalogError::Status { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "upstream down");
        }
        other => panic!("unexpected error: {other}"),
    }
}

async fn completions(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    recorded.push(headers, body);
    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": "  Fresh copy \n" } }]
    }))
}

#[tokio::test]
async fn test_openai_generator_sends_chat_completion() {
    let recorded = Recorded::default();
    let router = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(recorded.clone());
    let base = spawn(router).await;
    let generator = OpenAIGenerator::new(
        Some("sk-test".to_string()),
        "gpt-4o-mini",
        format!("{base}/v1/chat/completions"),
    );

    let text = generator
        .generate(&GenerationRequest {
            product_id: "1".to_string(),
            text: "Write a title.\n\nProduct Title: Mug".to_string(),
            image_url: Some("https://cdn.example.com/mug.png".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(text, "Fresh copy");

    let requests = recorded.all();
    let (headers, body) = &requests[0];
    assert_eq!(headers["authorization"], "Bearer sk-test");
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_tokens"], 300);
    assert_eq!(body["messages"][0]["role"], "system");
    let content = body["messages"][1]["content"].as_array().unwrap();
    assert_eq!(content[0]["text"], "Write a title.\n\nProduct Title: Mug");
    assert_eq!(
        content[1]["image_url"]["url"],
        "https://cdn.example.com/mug.png"
    );
}

#[tokio::test]
async fn test_openai_generator_reports_upstream_status() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
    );
    let base = spawn(router).await;
    let generator = OpenAIGenerator::new(
        Some("sk-test".to_string()),
        "gpt-4o-mini",
        format!("{base}/v1/chat/completions"),
    );

    let err = generator
        .generate(&GenerationRequest {
            product_id: "1".to_string(),
            text: "p".to_string(),
            image_url: None,
        })
        .await
        .unwrap_err();

    match err {
        GenerationError::Status { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {other}"),
    }
}
