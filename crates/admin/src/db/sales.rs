//! Sales rollup tables and the reads behind the dashboard.
//!
//! `daily_sales` and `category_sales` are written only by the rollup
//! routine. Everything else here is a read.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use shopdesk_core::analytics::{DailyBucket, DeliveredItem, DeliveredOrder, MonthlySales, Rollup};
use shopdesk_core::{CategoryId, OrderId, ProductId};

use super::RepositoryError;
use crate::models::customer::ACTIVE_WINDOW_DAYS;
use crate::models::{CategoryReportRow, CustomerAnalytics, TopProduct};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DeliveredItemRow {
    order_id: i32,
    category_id: i32,
    quantity: i32,
    total: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct DailyRow {
    date: NaiveDate,
    total_sales: Decimal,
    total_orders: i32,
    total_items: i32,
    avg_order_value: Decimal,
}

impl From<DailyRow> for DailyBucket {
    fn from(row: DailyRow) -> Self {
        Self {
            date: row.date,
            total_sales: row.total_sales,
            total_orders: row.total_orders,
            total_items: row.total_items,
            avg_order_value: row.avg_order_value,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    date: NaiveDate,
    category_id: i32,
    category_name: String,
    sales: Decimal,
    orders: i32,
    items: i32,
}

impl From<CategoryRow> for CategoryReportRow {
    fn from(row: CategoryRow) -> Self {
        Self {
            date: row.date,
            category_id: CategoryId::new(row.category_id),
            category_name: row.category_name,
            sales: row.sales,
            orders: row.orders,
            items: row.items,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MonthRow {
    month: i32,
    sales: Decimal,
    orders: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct TopProductRow {
    product_id: i32,
    name: String,
    total_quantity: i64,
    total_sales: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerCountsRow {
    total: i64,
    new_this_month: i64,
    active: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sales rollups and dashboard aggregates.
pub struct SalesRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SalesRepository<'a> {
    /// Create a new sales repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders delivered on `date` (UTC), with their lines' categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delivered_orders_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<DeliveredOrder>, RepositoryError> {
        let orders: Vec<(i32, Decimal)> = sqlx::query_as(
            r"
            SELECT id, total
            FROM shop.orders
            WHERE status = 'delivered'
              AND delivered_at >= $1::date
              AND delivered_at < $1::date + 1
            ORDER BY id
            ",
        )
        .bind(date)
        .fetch_all(self.pool)
        .await?;

        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = orders.iter().map(|(id, _)| *id).collect();
        let items = sqlx::query_as::<_, DeliveredItemRow>(
            r"
            SELECT oi.order_id, p.category_id, oi.quantity, oi.total
            FROM shop.order_items oi
            JOIN shop.products p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.order_id, oi.id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut lines: HashMap<i32, Vec<DeliveredItem>> = HashMap::new();
        for item in items {
            lines.entry(item.order_id).or_default().push(DeliveredItem {
                category_id: CategoryId::new(item.category_id),
                quantity: item.quantity,
                total: item.total,
            });
        }

        Ok(orders
            .into_iter()
            .map(|(id, total)| DeliveredOrder {
                id: OrderId::new(id),
                total,
                items: lines.remove(&id).unwrap_or_default(),
            })
            .collect())
    }

    /// Write a day's buckets, replacing any earlier run for that date.
    ///
    /// Category rows from an earlier run whose category no longer sold on
    /// that day are removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing
    /// is written in that case.
    pub async fn upsert_rollup(&self, rollup: &Rollup) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let daily = &rollup.daily;

        sqlx::query(
            r"
            INSERT INTO shop.daily_sales
                (date, total_sales, total_orders, total_items, avg_order_value)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (date) DO UPDATE SET
                total_sales = EXCLUDED.total_sales,
                total_orders = EXCLUDED.total_orders,
                total_items = EXCLUDED.total_items,
                avg_order_value = EXCLUDED.avg_order_value,
                updated_at = NOW()
            ",
        )
        .bind(daily.date)
        .bind(daily.total_sales)
        .bind(daily.total_orders)
        .bind(daily.total_items)
        .bind(daily.avg_order_value)
        .execute(&mut *tx)
        .await?;

        let category_ids: Vec<i32> = rollup
            .categories
            .iter()
            .map(|c| c.category_id.as_i32())
            .collect();
        sqlx::query("DELETE FROM shop.category_sales WHERE date = $1 AND NOT (category_id = ANY($2))")
            .bind(daily.date)
            .bind(&category_ids)
            .execute(&mut *tx)
            .await?;

        for bucket in &rollup.categories {
            sqlx::query(
                r"
                INSERT INTO shop.category_sales (date, category_id, sales, orders, items)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (date, category_id) DO UPDATE SET
                    sales = EXCLUDED.sales,
                    orders = EXCLUDED.orders,
                    items = EXCLUDED.items,
                    updated_at = NOW()
                ",
            )
            .bind(bucket.date)
            .bind(bucket.category_id)
            .bind(bucket.sales)
            .bind(bucket.orders)
            .bind(bucket.items)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Per-month sales for `year`. Months without rows are absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn monthly_sales(&self, year: i32) -> Result<Vec<MonthlySales>, RepositoryError> {
        let rows = sqlx::query_as::<_, MonthRow>(
            r"
            SELECT EXTRACT(MONTH FROM date)::int AS month,
                   SUM(total_sales) AS sales,
                   SUM(total_orders)::bigint AS orders
            FROM shop.daily_sales
            WHERE date >= make_date($1, 1, 1) AND date < make_date($1 + 1, 1, 1)
            GROUP BY 1
            ORDER BY 1
            ",
        )
        .bind(year)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some(MonthlySales {
                    month: u32::try_from(row.month).ok()?,
                    sales: row.sales,
                    orders: row.orders,
                })
            })
            .collect())
    }

    /// Sales and orders over `start..=end` from the daily rollup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn totals_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Decimal, i64), RepositoryError> {
        let totals: (Decimal, i64) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(total_sales), 0), COALESCE(SUM(total_orders), 0)::bigint
            FROM shop.daily_sales
            WHERE date BETWEEN $1 AND $2
            ",
        )
        .bind(start)
        .bind(end)
        .fetch_one(self.pool)
        .await?;
        Ok(totals)
    }

    /// All-time sales from the daily rollup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_time_sales(&self) -> Result<Decimal, RepositoryError> {
        let total: Decimal =
            sqlx::query_scalar("SELECT COALESCE(SUM(total_sales), 0) FROM shop.daily_sales")
                .fetch_one(self.pool)
                .await?;
        Ok(total)
    }

    /// Distinct years with rollup data.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn years_with_data(&self) -> Result<Vec<i32>, RepositoryError> {
        let years: Vec<i32> = sqlx::query_scalar(
            "SELECT DISTINCT EXTRACT(YEAR FROM date)::int FROM shop.daily_sales ORDER BY 1 DESC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(years)
    }

    /// Daily rollup rows over `start..=end`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn daily_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBucket>, RepositoryError> {
        let rows = sqlx::query_as::<_, DailyRow>(
            r"
            SELECT date, total_sales, total_orders, total_items, avg_order_value
            FROM shop.daily_sales
            WHERE date BETWEEN $1 AND $2
            ORDER BY date
            ",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Category rollup rows over `start..=end`, by date then category name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CategoryReportRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT cs.date, cs.category_id, c.name AS category_name,
                   cs.sales, cs.orders, cs.items
            FROM shop.category_sales cs
            JOIN shop.categories c ON c.id = cs.category_id
            WHERE cs.date BETWEEN $1 AND $2
            ORDER BY cs.date, c.name
            ",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Customers with more than one delivered order, and all customers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn repeat_customers(&self) -> Result<(i64, i64), RepositoryError> {
        let counts: (i64, i64) = sqlx::query_as(
            r"
            SELECT
                (SELECT COUNT(*) FROM (
                    SELECT customer_id
                    FROM shop.orders
                    WHERE status = 'delivered'
                    GROUP BY customer_id
                    HAVING COUNT(*) > 1
                ) repeaters),
                (SELECT COUNT(*) FROM shop.customers)
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }

    /// Best sellers by revenue over delivered orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_products(&self, limit: i64) -> Result<Vec<TopProduct>, RepositoryError> {
        let rows = sqlx::query_as::<_, TopProductRow>(
            r"
            SELECT p.id AS product_id, p.name,
                   SUM(oi.quantity)::bigint AS total_quantity,
                   SUM(oi.total) AS total_sales
            FROM shop.order_items oi
            JOIN shop.orders o ON o.id = oi.order_id
            JOIN shop.products p ON p.id = oi.product_id
            WHERE o.status = 'delivered'
            GROUP BY p.id, p.name
            ORDER BY total_sales DESC, p.id
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopProduct {
                product_id: ProductId::new(row.product_id),
                name: row.name,
                total_quantity: row.total_quantity,
                total_sales: row.total_sales,
            })
            .collect())
    }

    /// Customer counters. `month_start` bounds "new this month".
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn customer_analytics(
        &self,
        month_start: DateTime<Utc>,
    ) -> Result<CustomerAnalytics, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerCountsRow>(
            r"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE c.created_at >= $1) AS new_this_month,
                COUNT(*) FILTER (WHERE EXISTS (
                    SELECT 1 FROM shop.orders o
                    WHERE o.customer_id = c.id
                      AND o.created_at >= NOW() - make_interval(days => $2)
                )) AS active
            FROM shop.customers c
            ",
        )
        .bind(month_start)
        .bind(ACTIVE_WINDOW_DAYS)
        .fetch_one(self.pool)
        .await?;

        Ok(CustomerAnalytics::new(
            row.total,
            row.new_this_month,
            row.active,
        ))
    }
}
