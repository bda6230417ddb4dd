//! Category repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use shopdesk_core::CategoryId;

use super::RepositoryError;
use crate::models::{Category, NewCategory};

/// Message for a rename or create that collides with an existing name.
pub const DUPLICATE_NAME: &str = "A category with this name already exists";

/// Message for deleting a category that still has products.
pub const HAS_PRODUCTS: &str = "Cannot delete a category that still has products";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    description: Option<String>,
    image_url: Option<String>,
    is_active: bool,
    sort_order: i32,
    product_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            description: row.description,
            image_url: row.image_url,
            is_active: row.is_active,
            sort_order: row.sort_order,
            product_count: row.product_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_WITH_COUNT: &str = r"
    SELECT c.id, c.name, c.description, c.image_url, c.is_active, c.sort_order,
           (SELECT COUNT(*) FROM shop.products p WHERE p.category_id = c.id) AS product_count,
           c.created_at, c.updated_at
    FROM shop.categories c
";

// =============================================================================
// Repository
// =============================================================================

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List categories ordered by sort order then name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, is_active: Option<bool>) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "{SELECT_WITH_COUNT}
             WHERE ($1::bool IS NULL OR c.is_active = $1)
             ORDER BY c.sort_order, c.name"
        ))
        .bind(is_active)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!("{SELECT_WITH_COUNT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Whether a category exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM shop.categories WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Whether another category already uses `name`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn name_taken(
        &self,
        name: &str,
        excluding: Option<CategoryId>,
    ) -> Result<bool, RepositoryError> {
        let taken: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM shop.categories
                WHERE name = $1 AND ($2::int IS NULL OR id <> $2)
            )
            ",
        )
        .bind(name)
        .bind(excluding)
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is already used.
    pub async fn create(&self, input: &NewCategory) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO shop.categories (name, description, image_url, is_active, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, image_url, is_active, sort_order,
                      0::bigint AS product_count, created_at, updated_at
            ",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(input.is_active)
        .bind(input.sort_order)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, DUPLICATE_NAME))?;

        Ok(row.into())
    }

    /// Replace a category's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the new name is already used.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &NewCategory,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            UPDATE shop.categories c
            SET name = $2, description = $3, image_url = $4, is_active = $5,
                sort_order = $6, updated_at = NOW()
            WHERE c.id = $1
            RETURNING c.id, c.name, c.description, c.image_url, c.is_active, c.sort_order,
                      (SELECT COUNT(*) FROM shop.products p WHERE p.category_id = c.id)
                          AS product_count,
                      c.created_at, c.updated_at
            ",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(input.is_active)
        .bind(input.sort_order)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, DUPLICATE_NAME))?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete a category that has no products.
    ///
    /// The product check and the delete run in one transaction with the
    /// category row locked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if any product references it.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let found: Option<i32> =
            sqlx::query_scalar("SELECT id FROM shop.categories WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if found.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.products WHERE category_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        ensure_no_products(products)?;

        sqlx::query("DELETE FROM shop.categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// A category may only be removed once no product points at it.
fn ensure_no_products(products: i64) -> Result<(), RepositoryError> {
    if products > 0 {
        return Err(RepositoryError::Conflict(HAS_PRODUCTS.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_with_products_is_kept() {
        assert!(ensure_no_products(0).is_ok());
        assert!(matches!(
            ensure_no_products(1),
            Err(RepositoryError::Conflict(ref msg)) if msg == HAS_PRODUCTS
        ));
    }
}
