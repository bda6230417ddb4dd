//! Integration tests for the session gate.
//!
//! These tests require a migrated database, a running admin server, and a
//! test admin (see the crate docs).

use reqwest::StatusCode;
use serde_json::json;

use shopdesk_integration_tests::{TestClient, admin_credentials};

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_api_requires_login() {
    let client = TestClient::anonymous();

    for path in ["/api/products", "/api/customers", "/api/orders", "/api/dashboard"] {
        let (status, body) = client.get(path).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Authentication required");
    }
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_wrong_password_is_401() {
    let client = TestClient::anonymous();
    let (email, _) = admin_credentials();

    let (status, body) = client
        .post(
            "/api/auth/login",
            &json!({"email": email, "password": "definitely-not-it"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, _) = client
        .post(
            "/api/auth/login",
            &json!({"email": "nobody@shopdesk.test", "password": "definitely-not-it"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_login_session_logout() {
    let client = TestClient::admin().await;

    let (status, body) = client.get("/api/auth/session").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["role"], "ADMIN");

    let (status, _) = client.get("/api/products/stats").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = client.post("/api/auth/logout", &json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = client.get("/api/auth/session").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["user"].is_null());

    let (status, _) = client.get("/api/products/stats").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
