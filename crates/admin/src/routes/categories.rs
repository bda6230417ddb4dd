//! Category API handlers.

use axum::{Json, Router, extract::State, routing::get};
use serde::Deserialize;
use tracing::instrument;

use shopdesk_core::CategoryId;

use crate::{
    api::{ApiResponse, ApiResult},
    db::{CategoryRepository, categories::DUPLICATE_NAME},
    error::{ApiJson, ApiPath, ApiQuery, AppError},
    middleware::RequireAdmin,
    models::{Category, CategoryInput, NewCategory},
    state::AppState,
};

/// Build the categories router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list).post(create))
        .route(
            "/api/categories/{id}",
            get(show).put(update).delete(destroy),
        )
}

/// `?isActive=` filter.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryQuery {
    pub is_active: Option<bool>,
}

const NOT_FOUND: &str = "Category not found";

fn not_found() -> AppError {
    AppError::NotFound(NOT_FOUND.to_string())
}

/// Reject a name another category already uses.
async fn ensure_name_free(
    repo: &CategoryRepository<'_>,
    input: &NewCategory,
    excluding: Option<CategoryId>,
) -> Result<(), AppError> {
    if repo.name_taken(&input.name, excluding).await? {
        return Err(AppError::BadRequest(DUPLICATE_NAME.to_string()));
    }
    Ok(())
}

/// List categories with product counts.
#[instrument(skip_all)]
pub async fn list(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> ApiResult<Vec<Category>> {
    let categories = CategoryRepository::new(state.pool())
        .list(query.is_active)
        .await?;
    Ok(Json(ApiResponse::ok(categories)))
}

/// Create a category.
#[instrument(skip_all)]
pub async fn create(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> ApiResult<Category> {
    let input = input.validate().map_err(AppError::Validation)?;
    let repo = CategoryRepository::new(state.pool());
    ensure_name_free(&repo, &input, None).await?;

    let category = repo.create(&input).await?;
    tracing::info!(category_id = %category.id, user_id = %user.id, "Category created");
    Ok(Json(
        ApiResponse::ok(category).with_message("Category created"),
    ))
}

/// Get one category.
#[instrument(skip_all)]
pub async fn show(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> ApiResult<Category> {
    let category = CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(ApiResponse::ok(category)))
}

/// Replace a category.
#[instrument(skip_all)]
pub async fn update(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> ApiResult<Category> {
    let input = input.validate().map_err(AppError::Validation)?;
    let repo = CategoryRepository::new(state.pool());
    if !repo.exists(id).await? {
        return Err(not_found());
    }
    ensure_name_free(&repo, &input, Some(id)).await?;

    let category = repo.update(id, &input).await?;
    tracing::info!(category_id = %id, user_id = %user.id, "Category updated");
    Ok(Json(
        ApiResponse::ok(category).with_message("Category updated"),
    ))
}

/// Delete a category that no product references.
#[instrument(skip_all)]
pub async fn destroy(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> ApiResult<()> {
    CategoryRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| AppError::or_not_found(e, NOT_FOUND))?;
    tracing::info!(category_id = %id, user_id = %user.id, "Category deleted");
    Ok(Json(ApiResponse::message("Category deleted")))
}
