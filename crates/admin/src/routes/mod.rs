//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness check
//! GET    /health/ready                    - Readiness check (database)
//!
//! # Auth (no session required)
//! POST   /api/auth/login                  - Email/password login
//! POST   /api/auth/logout                 - Logout
//! GET    /api/auth/session                - Current user, if any
//!
//! # Catalog (admin only, as is everything below)
//! GET    /api/categories                  - List categories
//! POST   /api/categories                  - Create category
//! GET    /api/categories/{id}             - Category detail
//! PUT    /api/categories/{id}             - Update category
//! DELETE /api/categories/{id}             - Delete category
//! GET    /api/products                    - List products (paginated)
//! POST   /api/products                    - Create product
//! GET    /api/products/stats              - Stock counters
//! GET    /api/products/{id}               - Product detail
//! PUT    /api/products/{id}               - Update product
//! DELETE /api/products/{id}               - Delete or deactivate product
//! GET    /api/products/{id}/stock-history - Stock movements
//!
//! # Customers
//! GET    /api/customers                   - List customers (paginated)
//! POST   /api/customers                   - Create customer
//! GET    /api/customers/{id}              - Customer detail with addresses
//! PUT    /api/customers/{id}              - Update customer
//! DELETE /api/customers/{id}              - Delete customer
//! POST   /api/customers/{id}/addresses    - Add address
//!
//! # Orders
//! GET    /api/orders                      - List orders with status counts
//! POST   /api/orders                      - Place order
//! GET    /api/orders/{id}                 - Order detail
//! PATCH  /api/orders/{id}/status          - Change order/payment status
//!
//! # Dashboard and reports
//! GET    /api/dashboard                   - Charts and KPIs for a year
//! GET    /api/dashboard/low-stock         - Stock alerts
//! GET    /api/dashboard/top-products      - Best sellers
//! GET    /api/dashboard/customers         - Customer counters
//! GET    /api/reports/sales               - Sales report for a date range
//! POST   /api/sales/rollup                - Recompute rollups for a date
//! ```

pub mod auth;
pub mod categories;
pub mod customers;
pub mod dashboard;
pub mod orders;
pub mod products;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

/// Build the complete route tree (without middleware).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth::router())
        .merge(categories::router())
        .merge(products::router())
        .merge(customers::router())
        .merge(orders::router())
        .merge(dashboard::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
