//! Customer API handlers.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shopdesk_core::CustomerId;

use crate::{
    api::{ApiResponse, ApiResult, PageParams, Pagination},
    db::{CustomerRepository, customers::DUPLICATE_EMAIL},
    error::{ApiJson, ApiPath, ApiQuery, AppError},
    middleware::RequireAdmin,
    models::{Address, AddressInput, Customer, CustomerDetail, CustomerInput, CustomerSummary},
    state::AppState,
};

const NOT_FOUND: &str = "Customer not found";

/// Build the customers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list).post(create))
        .route(
            "/api/customers/{id}",
            get(show).put(update).delete(destroy),
        )
        .route("/api/customers/{id}/addresses", post(add_address))
}

/// `?page&limit&search` query.
#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

impl CustomerQuery {
    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// One page of customers.
#[derive(Debug, Serialize)]
pub struct CustomerPage {
    pub customers: Vec<CustomerSummary>,
    pub pagination: Pagination,
}

/// List customers with order statistics.
#[instrument(skip_all)]
pub async fn list(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CustomerQuery>,
) -> ApiResult<CustomerPage> {
    let params = query.page_params();
    let search = query.search();
    let repo = CustomerRepository::new(state.pool());

    let (customers, total) = tokio::try_join!(
        repo.list(search, params.limit(), params.offset()),
        repo.count(search),
    )?;

    Ok(Json(ApiResponse::ok(CustomerPage {
        customers,
        pagination: Pagination::new(params, total),
    })))
}

/// Create a customer.
#[instrument(skip_all)]
pub async fn create(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CustomerInput>,
) -> ApiResult<Customer> {
    let input = input.validate().map_err(AppError::Validation)?;
    let repo = CustomerRepository::new(state.pool());
    if repo.email_taken(&input.email, None).await? {
        return Err(AppError::BadRequest(DUPLICATE_EMAIL.to_string()));
    }

    let customer = repo.create(&input).await?;
    tracing::info!(customer_id = %customer.id, user_id = %user.id, "Customer created");
    Ok(Json(
        ApiResponse::ok(customer).with_message("Customer created"),
    ))
}

/// Customer with statistics and addresses.
#[instrument(skip_all)]
pub async fn show(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CustomerId>,
) -> ApiResult<CustomerDetail> {
    let customer = CustomerRepository::new(state.pool())
        .get_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(Json(ApiResponse::ok(customer)))
}

/// Replace a customer's contact details.
#[instrument(skip_all)]
pub async fn update(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CustomerId>,
    ApiJson(input): ApiJson<CustomerInput>,
) -> ApiResult<Customer> {
    let input = input.validate().map_err(AppError::Validation)?;
    let repo = CustomerRepository::new(state.pool());
    if repo.email_taken(&input.email, Some(id)).await? {
        return Err(AppError::BadRequest(DUPLICATE_EMAIL.to_string()));
    }

    let customer = repo
        .update(id, &input)
        .await
        .map_err(|e| AppError::or_not_found(e, NOT_FOUND))?;
    tracing::info!(customer_id = %id, user_id = %user.id, "Customer updated");
    Ok(Json(
        ApiResponse::ok(customer).with_message("Customer updated"),
    ))
}

/// Delete a customer without orders.
#[instrument(skip_all)]
pub async fn destroy(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CustomerId>,
) -> ApiResult<()> {
    CustomerRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| AppError::or_not_found(e, NOT_FOUND))?;
    tracing::info!(customer_id = %id, user_id = %user.id, "Customer deleted");
    Ok(Json(ApiResponse::message("Customer deleted")))
}

/// Add a shipping address to a customer.
#[instrument(skip_all)]
pub async fn add_address(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CustomerId>,
    ApiJson(input): ApiJson<AddressInput>,
) -> ApiResult<Address> {
    let input = input.validate().map_err(AppError::Validation)?;
    let address = CustomerRepository::new(state.pool())
        .add_address(id, &input)
        .await
        .map_err(|e| AppError::or_not_found(e, NOT_FOUND))?;
    tracing::info!(
        customer_id = %id,
        address_id = %address.id,
        is_default = address.is_default,
        user_id = %user.id,
        "Address added"
    );
    Ok(Json(ApiResponse::ok(address).with_message("Address added")))
}
