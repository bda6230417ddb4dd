//! Product API handlers.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shopdesk_core::{CategoryId, ProductId};

use crate::{
    api::{ApiResponse, ApiResult, PageParams, Pagination},
    db::{
        CategoryRepository, ProductRepository,
        products::{DUPLICATE_SKU, ProductDeletion},
    },
    error::{ApiJson, ApiPath, ApiQuery, AppError},
    middleware::RequireAdmin,
    models::{NewProduct, Product, ProductFilter, ProductInput, ProductStats, StockHistoryEntry},
    state::AppState,
};

const NOT_FOUND: &str = "Product not found";
const UNKNOWN_CATEGORY: &str = "The selected category does not exist";

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list).post(create))
        .route("/api/products/stats", get(stats))
        .route(
            "/api/products/{id}",
            get(show).put(update).delete(destroy),
        )
        .route("/api/products/{id}/stock-history", get(stock_history))
}

/// `?page&limit&search&category&isActive` query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category: Option<CategoryId>,
    pub is_active: Option<bool>,
}

impl ProductQuery {
    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    fn into_filter(self) -> ProductFilter {
        ProductFilter {
            search: self.search.filter(|s| !s.trim().is_empty()),
            category_id: self.category,
            is_active: self.is_active,
        }
    }
}

/// One page of products.
#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

/// Run the checks that need the database: the category must exist and the
/// SKU must be free.
async fn check_references(
    state: &AppState,
    input: &NewProduct,
    excluding: Option<ProductId>,
) -> Result<(), AppError> {
    if !CategoryRepository::new(state.pool())
        .exists(input.category_id)
        .await?
    {
        return Err(AppError::BadRequest(UNKNOWN_CATEGORY.to_string()));
    }

    if let Some(sku) = &input.sku
        && ProductRepository::new(state.pool())
            .sku_taken(sku, excluding)
            .await?
    {
        return Err(AppError::BadRequest(DUPLICATE_SKU.to_string()));
    }

    Ok(())
}

/// List products, newest first.
#[instrument(skip_all)]
pub async fn list(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<ProductPage> {
    let params = query.page_params();
    let filter = query.into_filter();
    let repo = ProductRepository::new(state.pool());

    let (products, total) = tokio::try_join!(
        repo.list(&filter, params.limit(), params.offset()),
        repo.count(&filter),
    )?;

    Ok(Json(ApiResponse::ok(ProductPage {
        products,
        pagination: Pagination::new(params, total),
    })))
}

/// Catalog stock counters.
#[instrument(skip_all)]
pub async fn stats(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<ProductStats> {
    let stats = ProductRepository::new(state.pool()).stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// Create a product.
#[instrument(skip_all)]
pub async fn create(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<Product> {
    let input = input.validate().map_err(AppError::Validation)?;
    check_references(&state, &input, None).await?;

    let product = ProductRepository::new(state.pool()).create(&input).await?;
    tracing::info!(product_id = %product.id, user_id = %user.id, "Product created");
    Ok(Json(
        ApiResponse::ok(product).with_message("Product created"),
    ))
}

/// Get one product.
#[instrument(skip_all)]
pub async fn show(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<Product> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(Json(ApiResponse::ok(product)))
}

/// Replace a product. Stock changes are written to the history.
#[instrument(skip_all)]
pub async fn update(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<Product> {
    let repo = ProductRepository::new(state.pool());
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    let input = input.validate().map_err(AppError::Validation)?;
    check_references(&state, &input, Some(id)).await?;

    let product = repo
        .update(id, &input)
        .await
        .map_err(|e| AppError::or_not_found(e, NOT_FOUND))?;
    tracing::info!(product_id = %id, user_id = %user.id, "Product updated");
    Ok(Json(
        ApiResponse::ok(product).with_message("Product updated"),
    ))
}

/// Delete a product, or deactivate it when orders reference it.
#[instrument(skip_all)]
pub async fn destroy(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<Option<Product>> {
    let deletion = ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| AppError::or_not_found(e, NOT_FOUND))?;

    match &deletion {
        ProductDeletion::Deactivated(_) => {
            tracing::info!(product_id = %id, user_id = %user.id, "Product deactivated");
        }
        ProductDeletion::Deleted => {
            tracing::info!(product_id = %id, user_id = %user.id, "Product deleted");
        }
    }
    Ok(Json(deletion_response(deletion)))
}

/// Envelope for a delete: the deactivated product, or only a message.
fn deletion_response(deletion: ProductDeletion) -> ApiResponse<Option<Product>> {
    match deletion {
        ProductDeletion::Deactivated(product) => ApiResponse::ok(Some(product))
            .with_message("Product has order history and was deactivated"),
        ProductDeletion::Deleted => ApiResponse {
            success: true,
            data: None,
            error: None,
            message: Some("Product deleted".to_string()),
        },
    }
}

/// Stock movements for one product, newest first.
#[instrument(skip_all)]
pub async fn stock_history(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<Vec<StockHistoryEntry>> {
    let repo = ProductRepository::new(state.pool());
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    let history = repo.stock_history(id).await?;
    Ok(Json(ApiResponse::ok(history)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shopdesk_core::StockStatus;

    use super::*;
    use crate::models::CategoryRef;

    fn retired_product() -> Product {
        Product {
            id: ProductId::new(9),
            name: "Canvas Tote".into(),
            description: "Sturdy everyday bag".into(),
            price: Decimal::new(2400, 0),
            cost_price: None,
            sku: Some("BAG-TOT-001".into()),
            stock: 4,
            low_stock_threshold: 10,
            stock_status: StockStatus::LowStock,
            is_active: false,
            image_url: None,
            images: Vec::new(),
            category: CategoryRef {
                id: CategoryId::new(2),
                name: "Bags".into(),
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_ordered_product_delete_returns_inactive_product() {
        let json =
            serde_json::to_value(deletion_response(ProductDeletion::Deactivated(retired_product())))
                .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["id"], 9);
        assert_eq!(json["data"]["isActive"], false);
        assert_eq!(
            json["message"],
            "Product has order history and was deactivated"
        );

        let json = serde_json::to_value(deletion_response(ProductDeletion::Deleted)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "message": "Product deleted"})
        );
    }

    #[test]
    fn test_query_parses_filters() {
        let query: ProductQuery =
            serde_json::from_str(r#"{"page":2,"limit":5,"search":"  ","category":3,"isActive":false}"#)
                .unwrap();
        let params = query.page_params();
        assert_eq!((params.page(), params.limit(), params.offset()), (2, 5, 5));

        let filter = query.into_filter();
        assert_eq!(filter.search, None);
        assert_eq!(filter.category_id, Some(CategoryId::new(3)));
        assert_eq!(filter.is_active, Some(false));
    }
}
