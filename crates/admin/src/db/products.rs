//! Product and stock history repository.
//!
//! Every stock change writes a `stock_history` row in the same transaction
//! as the stock update.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use shopdesk_core::{
    CategoryId, ProductId, StockChangeKind, StockHistoryId, StockStatus,
};

use super::{RepositoryError, like_pattern};
use crate::models::{
    CategoryRef, LowStockAlert, NewProduct, Product, ProductFilter, ProductStats,
    StockHistoryEntry,
};

/// Message for a create or update that collides with an existing SKU.
pub const DUPLICATE_SKU: &str = "This SKU is already in use";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    cost_price: Option<Decimal>,
    sku: Option<String>,
    stock: i32,
    low_stock_threshold: i32,
    is_active: bool,
    image_url: Option<String>,
    images: Vec<String>,
    category_id: i32,
    category_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            cost_price: row.cost_price,
            sku: row.sku,
            stock: row.stock,
            low_stock_threshold: row.low_stock_threshold,
            stock_status: StockStatus::from_levels(row.stock, row.low_stock_threshold),
            is_active: row.is_active,
            image_url: row.image_url,
            images: row.images,
            category: CategoryRef {
                id: CategoryId::new(row.category_id),
                name: row.category_name,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StockHistoryRow {
    id: i32,
    product_id: i32,
    kind: StockChangeKind,
    quantity: i32,
    reason: String,
    before_stock: i32,
    after_stock: i32,
    created_at: DateTime<Utc>,
}

impl From<StockHistoryRow> for StockHistoryEntry {
    fn from(row: StockHistoryRow) -> Self {
        Self {
            id: StockHistoryId::new(row.id),
            product_id: ProductId::new(row.product_id),
            kind: row.kind,
            quantity: row.quantity,
            reason: row.reason,
            before_stock: row.before_stock,
            after_stock: row.after_stock,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RestockRow {
    id: i32,
    name: String,
    sku: Option<String>,
    stock: i32,
    low_stock_threshold: i32,
    category_name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    total: i64,
    active: i64,
    low_stock: i64,
    out_of_stock: i64,
}

const SELECT_PRODUCT: &str = r"
    SELECT p.id, p.name, p.description, p.price, p.cost_price, p.sku, p.stock,
           p.low_stock_threshold, p.is_active, p.image_url, p.images,
           p.category_id, c.name AS category_name, p.created_at, p.updated_at
    FROM shop.products p
    JOIN shop.categories c ON c.id = p.category_id
";

const FILTER_CLAUSE: &str = r"
    WHERE ($1::text IS NULL OR p.name ILIKE $1 OR p.description ILIKE $1 OR p.sku ILIKE $1)
      AND ($2::int IS NULL OR p.category_id = $2)
      AND ($3::bool IS NULL OR p.is_active = $3)
";

/// Result of deleting a product.
#[derive(Debug)]
pub enum ProductDeletion {
    /// Order history references the product, so it was deactivated instead.
    Deactivated(Product),
    /// The row was removed.
    Deleted,
}

/// Append a stock movement. `quantity` is the absolute change.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub(crate) async fn record_stock_change(
    conn: &mut PgConnection,
    product_id: ProductId,
    kind: StockChangeKind,
    reason: &str,
    before_stock: i32,
    after_stock: i32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO shop.stock_history
            (product_id, kind, quantity, reason, before_stock, after_stock)
        VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(product_id)
    .bind(kind)
    .bind((after_stock - before_stock).abs())
    .bind(reason)
    .bind(before_stock)
    .bind(after_stock)
    .execute(conn)
    .await?;
    Ok(())
}

async fn fetch_product(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Product, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    row.map(Into::into).ok_or(RepositoryError::NotFound)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{SELECT_PRODUCT} {FILTER_CLAUSE} ORDER BY p.created_at DESC, p.id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filter.search.as_deref().map(like_pattern))
        .bind(filter.category_id)
        .bind(filter.is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Number of products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM shop.products p {FILTER_CLAUSE}"
        ))
        .bind(filter.search.as_deref().map(like_pattern))
        .bind(filter.category_id)
        .bind(filter.is_active)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Whether another product already uses `sku`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sku_taken(
        &self,
        sku: &str,
        excluding: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        let taken: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM shop.products
                WHERE sku = $1 AND ($2::int IS NULL OR id <> $2)
            )
            ",
        )
        .bind(sku)
        .bind(excluding)
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    /// Create a product. Opening stock is recorded as a purchase.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the SKU is already used.
    pub async fn create(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO shop.products
                (name, description, price, cost_price, sku, stock, low_stock_threshold,
                 is_active, image_url, images, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            ",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.cost_price)
        .bind(&input.sku)
        .bind(input.stock)
        .bind(input.low_stock_threshold)
        .bind(input.is_active)
        .bind(&input.image_url)
        .bind(&input.images)
        .bind(input.category_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, DUPLICATE_SKU))?;
        let id = ProductId::new(id);

        if input.stock > 0 {
            record_stock_change(
                &mut tx,
                id,
                StockChangeKind::Purchase,
                "Initial stock",
                0,
                input.stock,
            )
            .await?;
        }

        let product = fetch_product(&mut tx, id).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// Replace a product's fields. A stock change is recorded as a purchase
    /// when it goes up and an adjustment when it goes down.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the SKU is already used.
    pub async fn update(
        &self,
        id: ProductId,
        input: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let before: Option<i32> =
            sqlx::query_scalar("SELECT stock FROM shop.products WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(before) = before else {
            return Err(RepositoryError::NotFound);
        };

        sqlx::query(
            r"
            UPDATE shop.products
            SET name = $2, description = $3, price = $4, cost_price = $5, sku = $6,
                stock = $7, low_stock_threshold = $8, is_active = $9, image_url = $10,
                images = $11, category_id = $12, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.cost_price)
        .bind(&input.sku)
        .bind(input.stock)
        .bind(input.low_stock_threshold)
        .bind(input.is_active)
        .bind(&input.image_url)
        .bind(&input.images)
        .bind(input.category_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, DUPLICATE_SKU))?;

        if input.stock != before {
            record_stock_change(
                &mut tx,
                id,
                StockChangeKind::for_manual_change(before, input.stock),
                "Manual stock update",
                before,
                input.stock,
            )
            .await?;
        }

        let product = fetch_product(&mut tx, id).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// Delete a product, or deactivate it when order items reference it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<ProductDeletion, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let found: Option<i32> =
            sqlx::query_scalar("SELECT id FROM shop.products WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if found.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM shop.order_items WHERE product_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let outcome = if referenced {
            sqlx::query(
                "UPDATE shop.products SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
            ProductDeletion::Deactivated(fetch_product(&mut tx, id).await?)
        } else {
            sqlx::query("DELETE FROM shop.products WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            ProductDeletion::Deleted
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Catalog-wide counters. Low and out-of-stock use each product's own
    /// threshold.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<ProductStats, RepositoryError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE is_active) AS active,
                   COUNT(*) FILTER (WHERE stock > 0 AND stock <= low_stock_threshold) AS low_stock,
                   COUNT(*) FILTER (WHERE stock = 0) AS out_of_stock
            FROM shop.products
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(ProductStats {
            total: row.total,
            active: row.active,
            low_stock: row.low_stock,
            out_of_stock: row.out_of_stock,
        })
    }

    /// Stock movements for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock_history(
        &self,
        id: ProductId,
    ) -> Result<Vec<StockHistoryEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, StockHistoryRow>(
            r"
            SELECT id, product_id, kind, quantity, reason, before_stock, after_stock, created_at
            FROM shop.stock_history
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Active products at or below `limit` units, lowest stock first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn restock_candidates(
        &self,
        limit: i32,
    ) -> Result<Vec<LowStockAlert>, RepositoryError> {
        let rows = sqlx::query_as::<_, RestockRow>(
            r"
            SELECT p.id, p.name, p.sku, p.stock, p.low_stock_threshold,
                   c.name AS category_name
            FROM shop.products p
            JOIN shop.categories c ON c.id = p.category_id
            WHERE p.is_active AND p.stock <= $1
            ORDER BY p.stock, p.name
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| LowStockAlert {
                product_id: ProductId::new(row.id),
                stock_status: StockStatus::from_levels(row.stock, limit),
                name: row.name,
                sku: row.sku,
                stock: row.stock,
                low_stock_threshold: row.low_stock_threshold,
                category_name: row.category_name,
            })
            .collect())
    }
}
