//! Integration tests for categories and products.
//!
//! These tests require a migrated database, a running admin server, and a
//! test admin (see the crate docs).

#![allow(clippy::indexing_slicing)]

use reqwest::StatusCode;
use serde_json::json;

use shopdesk_integration_tests::{TestClient, unique_suffix};

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_duplicate_sku_rejected() {
    let client = TestClient::admin().await;
    let category = client
        .create_category(&format!("SKU test {}", unique_suffix()))
        .await;
    let sku = format!("SKU-{}", unique_suffix());
    client.create_product(category, &sku, 1200, 3).await;

    let (status, body) = client
        .post(
            "/api/products",
            &json!({
                "name": "Second product",
                "description": "Same SKU",
                "price": 900,
                "stock": 1,
                "categoryId": category,
                "sku": sku,
                "isActive": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "This SKU is already in use");
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_validation_reports_every_problem() {
    let client = TestClient::admin().await;

    let (status, body) = client
        .post(
            "/api/products",
            &json!({"price": 0, "stock": -1, "sku": "ab"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = body["error"].as_str().unwrap_or_default();
    for expected in [
        "Product name is required",
        "Price must be greater than 0",
        "Stock must be 0 or more",
        "Category is required",
        "SKU must be at least 3 characters",
    ] {
        assert!(error.contains(expected), "{expected} missing from {error}");
    }
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_category_with_products_cannot_be_deleted() {
    let client = TestClient::admin().await;
    let category = client
        .create_category(&format!("Delete test {}", unique_suffix()))
        .await;
    let product = client
        .create_product(category, &format!("DEL-{}", unique_suffix()), 500, 0)
        .await;

    let (status, body) = client.delete(&format!("/api/categories/{category}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot delete a category that still has products");

    let (status, _) = client.delete(&format!("/api/products/{product}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = client.delete(&format!("/api/categories/{category}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = client.get(&format!("/api/categories/{category}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_duplicate_category_name_rejected() {
    let client = TestClient::admin().await;
    let name = format!("Dup {}", unique_suffix());
    client.create_category(&name).await;

    let (status, body) = client
        .post("/api/categories", &json!({"name": format!("  {name}  ")}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A category with this name already exists");
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_stock_changes_are_recorded() {
    let client = TestClient::admin().await;
    let category = client
        .create_category(&format!("Stock {}", unique_suffix()))
        .await;
    let sku = format!("STK-{}", unique_suffix());
    let product = client.create_product(category, &sku, 800, 10).await;

    let (status, body) = client
        .put(
            &format!("/api/products/{product}"),
            &json!({
                "name": format!("Product {sku}"),
                "description": "Integration test product",
                "price": 800,
                "stock": 4,
                "lowStockThreshold": 5,
                "categoryId": category,
                "sku": sku,
                "isActive": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stockStatus"], "LOW_STOCK");

    let (status, body) = client
        .get(&format!("/api/products/{product}/stock-history"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let history = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["type"], "ADJUSTMENT");
    assert_eq!(history[0]["quantity"], 6);
    assert_eq!(history[1]["type"], "PURCHASE");
    assert_eq!(history[1]["quantity"], 10);
}
