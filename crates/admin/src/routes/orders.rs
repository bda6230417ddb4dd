//! Order API handlers.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shopdesk_core::{OrderId, OrderStatus};

use crate::{
    api::{ApiResponse, ApiResult, PageParams, Pagination},
    db::{OrderRepository, orders::StatusChange},
    error::{ApiJson, ApiPath, ApiQuery, AppError},
    middleware::RequireAdmin,
    models::{OrderDetail, OrderInput, OrderListItem, StatusCounts, StatusUpdateInput},
    state::AppState,
};

const NOT_FOUND: &str = "Order not found";

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list).post(create))
        .route("/api/orders/{id}", get(show))
        .route("/api/orders/{id}/status", patch(update_status))
}

/// `?page&limit&status&search` query. `status=all` means no filter.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl OrderQuery {
    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    fn status(&self) -> Result<Option<OrderStatus>, AppError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
            Some(s) => s
                .parse::<OrderStatus>()
                .map(Some)
                .map_err(|e| AppError::BadRequest(e.to_string())),
        }
    }

    fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// One page of orders plus counts for the status tabs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub orders: Vec<OrderListItem>,
    pub pagination: Pagination,
    pub status_counts: StatusCounts,
}

/// List orders, newest first.
#[instrument(skip_all)]
pub async fn list(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> ApiResult<OrderPage> {
    let params = query.page_params();
    let status = query.status()?;
    let search = query.search();
    let repo = OrderRepository::new(state.pool());

    let (orders, total, status_counts) = tokio::try_join!(
        repo.list(status, search, params.limit(), params.offset()),
        repo.count(status, search),
        repo.status_counts(),
    )?;

    Ok(Json(ApiResponse::ok(OrderPage {
        orders,
        pagination: Pagination::new(params, total),
        status_counts,
    })))
}

/// Place an order: prices lines, reserves stock, numbers the order.
#[instrument(skip_all)]
pub async fn create(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<OrderInput>,
) -> ApiResult<OrderDetail> {
    let input = input.validate().map_err(AppError::Validation)?;
    let order = OrderRepository::new(state.pool()).create(&input).await?;
    tracing::info!(
        order_id = %order.order.id,
        order_number = %order.order.order_number,
        user_id = %user.id,
        "Order placed"
    );
    Ok(Json(ApiResponse::ok(order).with_message("Order created")))
}

/// Order with customer and lines.
#[instrument(skip_all)]
pub async fn show(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<OrderDetail> {
    let order = OrderRepository::new(state.pool())
        .get_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(Json(ApiResponse::ok(order)))
}

/// Move an order through its lifecycle and/or set its payment status.
#[instrument(skip_all)]
pub async fn update_status(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(input): ApiJson<StatusUpdateInput>,
) -> ApiResult<OrderDetail> {
    if input.status.is_none() && input.payment_status.is_none() {
        return Err(AppError::invalid("status or paymentStatus is required"));
    }

    let order = OrderRepository::new(state.pool())
        .update_status(
            id,
            StatusChange {
                status: input.status,
                payment_status: input.payment_status,
            },
        )
        .await
        .map_err(|e| AppError::or_not_found(e, NOT_FOUND))?;

    tracing::info!(
        order_id = %id,
        status = %order.order.status,
        payment_status = ?order.order.payment_status,
        user_id = %user.id,
        "Order status updated"
    );
    Ok(Json(
        ApiResponse::ok(order).with_message("Order status updated"),
    ))
}
