//! API endpoint tests for catalog, generation and apply routes.
//!
//! These tests exercise the endpoints the embedded admin app calls:
//! - GET /app/products
//! - POST /app/generate
//! - POST /app/apply-single
//! - POST /app/apply-all

#[path = "../support/mod.rs"]
mod support;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use std::sync::Arc;

use flows_api::models::CollectionRef;
use flows_api::routes::create_app;
use support::{FakeCatalog, FakeGenerator, product, products, test_state};

fn create_test_server(catalog: FakeCatalog, generator: FakeGenerator) -> TestServer {
    let state = test_state(Arc::new(catalog), Arc::new(generator));
    TestServer::new(create_app(state)).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server(FakeCatalog::default(), FakeGenerator::new("x"));
    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_products_endpoint_returns_catalog_and_facets() {
    let mut tote = product("1", "Canvas Tote");
    tote.tags = vec!["bags".to_string()];
    tote.collections = vec![CollectionRef {
        id: "9".to_string(),
        title: "Summer".to_string(),
    }];
    let mut hat = product("2", "Wool Hat");
    hat.vendor = "Globex".to_string();

    let server = create_test_server(
        FakeCatalog::with_products(vec![tote, hat]),
        FakeGenerator::new("x"),
    );
    let response = server.get("/app/products").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["products"].as_array().unwrap().len(), 2);
    assert_eq!(body["products"][0]["productType"], "Mugs");
    assert_eq!(body["vendors"], json!(["Acme", "Globex"]));
    assert_eq!(body["productTypes"], json!(["Mugs"]));
    assert_eq!(body["tags"], json!(["bags"]));
    assert_eq!(body["collections"], json!([{ "id": "9", "title": "Summer" }]));
}

#[tokio::test]
async fn test_products_endpoint_applies_query_filters() {
    let server = create_test_server(
        FakeCatalog::with_products(products(5)),
        FakeGenerator::new("x"),
    );
    let response = server
        .get("/app/products")
        .add_query_param("search", "product 3")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let ids: Vec<&str> = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["3"]);
}

#[tokio::test]
async fn test_products_endpoint_reports_catalog_failure() {
    let catalog = FakeCatalog {
        fail_page: Some(1),
        ..FakeCatalog::with_products(products(3))
    };
    let server = create_test_server(catalog, FakeGenerator::new("x"));
    let response = server.get("/app/products").expect_failure().await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["status"], 500);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_generate_endpoint_returns_one_result_per_product() {
    let server = create_test_server(
        FakeCatalog::default(),
        FakeGenerator::new("Hello").failing("2"),
    );
    let request_body = json!({
        "products": [
            { "id": "1", "title": "Mug", "vendor": "Acme", "productType": "Mugs", "tags": [], "collections": [] },
            { "id": "2", "title": "Cup", "vendor": "Acme", "productType": "Mugs", "tags": [], "collections": [] }
        ],
        "prompt": "Write a title.",
        "destinations": ["Product Title", "Product Description"]
    });

    let response = server.post("/app/generate").json(&request_body).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    for result in results {
        if result["id"] == "1" {
            assert_eq!(result["generatedTitle"], "Hello");
            assert_eq!(result["generatedDescription"], "Hello");
            assert_eq!(result["error"], Value::Null);
        } else {
            assert!(result.get("generatedTitle").is_none());
            assert!(result["error"].as_str().unwrap().contains("500"));
        }
    }
}

#[tokio::test]
async fn test_generate_endpoint_rejects_empty_requests() {
    let server = create_test_server(FakeCatalog::default(), FakeGenerator::new("x"));

    let response = server
        .post("/app/generate")
        .json(&json!({ "products": [], "prompt": "p", "destinations": ["SEO Title"] }))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/app/generate")
        .json(&json!({ "products": [{ "id": "1", "title": "Mug" }], "destinations": [] }))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No destinations provided.");
}

#[tokio::test]
async fn test_apply_single_endpoint() {
    let server = create_test_server(FakeCatalog::default(), FakeGenerator::new("x"));
    let request_body = json!({
        "product": {
            "id": "7",
            "title": "Mug",
            "generatedDescription": "Line1\nLine2",
            "error": null
        },
        "destinations": ["Product Description"]
    });

    let response = server.post("/app/apply-single").json(&request_body).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["product"]["id"], "gid://shopify/Product/7");
    assert_eq!(body["product"]["descriptionHtml"], "<p>Line1</p><p>Line2</p>");
}

#[tokio::test]
async fn test_apply_single_surfaces_user_errors() {
    let server = create_test_server(FakeCatalog::default().reject("7"), FakeGenerator::new("x"));
    let request_body = json!({
        "product": { "id": "7", "title": "Mug", "generatedTitle": "Too long", "error": null },
        "destinations": ["Product Title"]
    });

    let response = server
        .post("/app/apply-single")
        .json(&request_body)
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["userErrors"][0]["message"], "Title is too long");
    assert_eq!(body["userErrors"][0]["field"], json!(["title"]));
}

#[tokio::test]
async fn test_apply_all_endpoint_reports_summary() {
    let server = create_test_server(FakeCatalog::default().reject("2"), FakeGenerator::new("x"));
    let request_body = json!({
        "products": [
            { "id": "1", "title": "Mug", "generatedSeoTitle": "Mug", "error": null },
            { "id": "2", "title": "Cup", "generatedSeoTitle": "Cup", "error": null },
            { "id": "3", "title": "Jar", "error": "Generation cancelled" }
        ],
        "destinations": ["SEO Title"]
    });

    let response = server.post("/app/apply-all").json(&request_body).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["summary"], json!({ "applied": 1, "failed": 1, "skipped": 1 }));
    assert_eq!(body["outcomes"][0]["status"], "applied");
    assert_eq!(body["outcomes"][1]["status"], "failed");
    assert_eq!(body["outcomes"][2]["status"], "skipped");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let server = create_test_server(FakeCatalog::default(), FakeGenerator::new("x"));
    let response = server.get("/app/openapi.json").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["paths"].get("/products").is_some());
    assert!(body["paths"].get("/runs/{run_id}/apply-all").is_some());
}

#[tokio::test]
async fn test_missing_request_fields_get_the_error_envelope() {
    let server = create_test_server(FakeCatalog::default(), FakeGenerator::new("x"));

    let response = server
        .post("/app/generate")
        .json(&json!({ "products": [{ "id": "1", "title": "Mug" }], "prompt": "p" }))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "No destinations provided.");

    let response = server
        .post("/app/generate")
        .json(&json!({ "prompt": "p", "destinations": ["SEO Title"] }))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "No products provided.");

    let response = server
        .post("/app/apply-single")
        .json(&json!({ "product": { "id": "7", "title": "Mug", "generatedTitle": "New" } }))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["status"], 400);

    let response = server
        .post("/app/apply-single")
        .json(&json!({ "destinations": ["Product Title"] }))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"].as_str().unwrap().contains("product"));

    let response = server
        .post("/app/apply-all")
        .json(&json!({ "destinations": ["SEO Title"] }))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "No products provided.");
}
