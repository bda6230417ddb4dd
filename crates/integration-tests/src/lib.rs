//! Integration tests for Shopdesk.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate a scratch database and create a test admin
//! shopdesk-cli migrate
//! shopdesk-cli admin create -e test-admin@shopdesk.test -n "Test Admin" -p 'integration-pass-1'
//!
//! # Start the server, then run the ignored tests
//! cargo run -p shopdesk-admin &
//! cargo test -p shopdesk-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `SHOPDESK_TEST_URL` - Admin API base URL (default: `http://localhost:3001`)
//! - `SHOPDESK_TEST_EMAIL` / `SHOPDESK_TEST_PASSWORD` - Admin login
//!
//! Tests that only exercise the public library API run without a server.

use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the admin API.
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("SHOPDESK_TEST_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// Login used by the authenticated tests.
#[must_use]
pub fn admin_credentials() -> (String, String) {
    (
        std::env::var("SHOPDESK_TEST_EMAIL")
            .unwrap_or_else(|_| "test-admin@shopdesk.test".to_string()),
        std::env::var("SHOPDESK_TEST_PASSWORD")
            .unwrap_or_else(|_| "integration-pass-1".to_string()),
    )
}

/// Short random suffix so runs do not collide on unique columns.
#[must_use]
pub fn unique_suffix() -> String {
    Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

/// HTTP client bound to the admin API with its own cookie jar.
pub struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    /// Client without a session.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            client: Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: admin_base_url(),
        }
    }

    /// Client logged in as the test admin.
    ///
    /// # Panics
    ///
    /// Panics if the login request fails.
    pub async fn admin() -> Self {
        let client = Self::anonymous();
        let (email, password) = admin_credentials();
        let (status, body) = client
            .post("/api/auth/login", &json!({"email": email, "password": password}))
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn read(response: Result<Response, reqwest::Error>) -> (StatusCode, Value) {
        let response = response.unwrap_or_else(|e| panic!("request failed: {e}"));
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// GET and decode the JSON envelope.
    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        Self::read(self.client.get(self.url(path)).send().await).await
    }

    /// POST a JSON body.
    pub async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> (StatusCode, Value) {
        Self::read(self.client.post(self.url(path)).json(body).send().await).await
    }

    /// PUT a JSON body.
    pub async fn put<T: Serialize + Sync>(&self, path: &str, body: &T) -> (StatusCode, Value) {
        Self::read(self.client.put(self.url(path)).json(body).send().await).await
    }

    /// PATCH a JSON body.
    pub async fn patch<T: Serialize + Sync>(&self, path: &str, body: &T) -> (StatusCode, Value) {
        Self::read(self.client.patch(self.url(path)).json(body).send().await).await
    }

    /// DELETE.
    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        Self::read(self.client.delete(self.url(path)).send().await).await
    }

    /// Create a category and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the category cannot be created.
    pub async fn create_category(&self, name: &str) -> i64 {
        let (status, body) = self
            .post("/api/categories", &json!({"name": name}))
            .await;
        assert_eq!(status, StatusCode::OK, "create category failed: {body}");
        data_id(&body)
    }

    /// Create a product and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the product cannot be created.
    pub async fn create_product(&self, category_id: i64, sku: &str, price: u32, stock: i32) -> i64 {
        let (status, body) = self
            .post(
                "/api/products",
                &json!({
                    "name": format!("Product {sku}"),
                    "description": "Integration test product",
                    "price": price,
                    "stock": stock,
                    "lowStockThreshold": 5,
                    "categoryId": category_id,
                    "sku": sku,
                    "isActive": true,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create product failed: {body}");
        data_id(&body)
    }

    /// Create a customer and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the customer cannot be created.
    pub async fn create_customer(&self) -> i64 {
        let email = format!("customer-{}@shopdesk.test", unique_suffix());
        let (status, body) = self
            .post(
                "/api/customers",
                &json!({"email": email, "name": "Integration Customer"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create customer failed: {body}");
        data_id(&body)
    }
}

/// `data.id` of an envelope.
///
/// # Panics
///
/// Panics if the envelope has no numeric `data.id`.
#[must_use]
pub fn data_id(body: &Value) -> i64 {
    body.pointer("/data/id")
        .and_then(Value::as_i64)
        .unwrap_or_else(|| panic!("missing data.id in {body}"))
}
