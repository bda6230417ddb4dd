//! Order repository.
//!
//! Order creation and status changes move stock, so both run in a single
//! transaction that locks the affected product rows in id order.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use shopdesk_core::analytics::{OrderTotals, line_total, price_order};
use shopdesk_core::{
    AddressId, CustomerId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId, StockChangeKind,
};

use super::products::record_stock_change;
use super::{RepositoryError, like_pattern};
use crate::models::order::order_number;
use crate::models::{NewOrder, Order, OrderDetail, OrderItem, OrderListItem, StatusCounts};

/// Attempts at finding a free order number before giving up.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    customer_id: i32,
    status: OrderStatus,
    subtotal: Decimal,
    shipping_fee: Decimal,
    tax: Decimal,
    total: Decimal,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    shipping_address_id: Option<i32>,
    notes: Option<String>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            customer_id: CustomerId::new(row.customer_id),
            status: row.status,
            subtotal: row.subtotal,
            shipping_fee: row.shipping_fee,
            tax: row.tax,
            total: row.total,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            shipping_address_id: row.shipping_address_id.map(AddressId::new),
            notes: row.notes,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderDetailRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_name: String,
    customer_email: String,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    product_name: String,
    sku: Option<String>,
    quantity: i32,
    price: Decimal,
    total: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            sku: row.sku,
            quantity: row.quantity,
            price: row.price,
            total: row.total,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderListRow {
    id: i32,
    order_number: String,
    customer_id: i32,
    customer_name: String,
    status: OrderStatus,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    total: Decimal,
    item_count: i64,
    created_at: DateTime<Utc>,
}

impl From<OrderListRow> for OrderListItem {
    fn from(row: OrderListRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            customer_id: CustomerId::new(row.customer_id),
            customer_name: row.customer_name,
            status: row.status,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            total: row.total,
            item_count: row.item_count,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LockedProductRow {
    id: i32,
    name: String,
    price: Decimal,
    stock: i32,
    is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct LockedItemRow {
    product_id: i32,
    quantity: i32,
    stock: i32,
}

const ORDER_COLUMNS: &str = r"
    o.id, o.order_number, o.customer_id, o.status, o.subtotal, o.shipping_fee, o.tax,
    o.total, o.payment_method, o.payment_status, o.shipping_address_id, o.notes,
    o.delivered_at, o.created_at, o.updated_at
";

const LIST_FILTER: &str = r"
    WHERE ($1::shop.order_status IS NULL OR o.status = $1)
      AND ($2::text IS NULL OR o.order_number ILIKE $2 OR c.name ILIKE $2 OR c.email ILIKE $2)
";

/// Status change applied by [`OrderRepository::update_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

async fn fetch_detail(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<OrderDetail>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderDetailRow>(&format!(
        "SELECT {ORDER_COLUMNS}, c.name AS customer_name, c.email AS customer_email
         FROM shop.orders o
         JOIN shop.customers c ON c.id = o.customer_id
         WHERE o.id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, OrderItemRow>(
        r"
        SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, p.sku,
               oi.quantity, oi.price, oi.total
        FROM shop.order_items oi
        JOIN shop.products p ON p.id = oi.product_id
        WHERE oi.order_id = $1
        ORDER BY oi.id
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(OrderDetail {
        order: row.order.into(),
        customer_name: row.customer_name,
        customer_email: row.customer_email,
        items: items.into_iter().map(Into::into).collect(),
    }))
}

/// Insert the order header under the next free number for `date`.
async fn insert_with_number(
    conn: &mut PgConnection,
    date: NaiveDate,
    order: &NewOrder,
    totals: &OrderTotals,
) -> Result<(OrderId, String), RepositoryError> {
    let prefix = format!("ORD-{}-%", date.format("%Y%m%d"));
    let placed_today: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM shop.orders WHERE order_number LIKE $1")
            .bind(&prefix)
            .fetch_one(&mut *conn)
            .await?;
    let mut sequence = u32::try_from(placed_today).unwrap_or(u32::MAX).saturating_add(1);

    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let number = order_number(date, sequence);
        let id: Option<i32> = sqlx::query_scalar(
            r"
            INSERT INTO shop.orders
                (order_number, customer_id, subtotal, shipping_fee, tax, total,
                 payment_method, shipping_address_id, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (order_number) DO NOTHING
            RETURNING id
            ",
        )
        .bind(&number)
        .bind(order.customer_id)
        .bind(totals.subtotal)
        .bind(totals.shipping_fee)
        .bind(totals.tax)
        .bind(totals.total)
        .bind(order.payment_method)
        .bind(order.shipping_address_id)
        .bind(&order.notes)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(id) = id {
            return Ok((OrderId::new(id), number));
        }

        tracing::debug!(order_number = %number, "Order number taken, retrying");
        sequence = rand::rng().random_range(1000..10_000);
    }

    Err(RepositoryError::Conflict(
        "Could not allocate an order number, please retry".to_string(),
    ))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OrderListItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderListRow>(&format!(
            "SELECT o.id, o.order_number, o.customer_id, c.name AS customer_name, o.status,
                    o.payment_method, o.payment_status, o.total,
                    (SELECT COUNT(*) FROM shop.order_items oi WHERE oi.order_id = o.id) AS item_count,
                    o.created_at
             FROM shop.orders o
             JOIN shop.customers c ON c.id = o.customer_id
             {LIST_FILTER}
             ORDER BY o.created_at DESC, o.id DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(status)
        .bind(search.map(like_pattern))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Number of orders matching the list filters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(
        &self,
        status: Option<OrderStatus>,
        search: Option<&str>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*)
             FROM shop.orders o
             JOIN shop.customers c ON c.id = o.customer_id
             {LIST_FILTER}"
        ))
        .bind(status)
        .bind(search.map(like_pattern))
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Orders per status across the whole shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_counts(&self) -> Result<StatusCounts, RepositoryError> {
        let rows: Vec<(OrderStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM shop.orders GROUP BY status")
                .fetch_all(self.pool)
                .await?;
        Ok(StatusCounts::from_rows(&rows))
    }

    /// Order with customer and lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_detail(&mut conn, id).await
    }

    /// Place an order: price the lines from the catalog, take the stock, and
    /// record one sale per line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` listing every problem when the
    /// customer, address, or any line is unusable.
    pub async fn create(&self, order: &NewOrder) -> Result<OrderDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut problems = Vec::new();

        let customer: Option<i32> =
            sqlx::query_scalar("SELECT id FROM shop.customers WHERE id = $1 FOR SHARE")
                .bind(order.customer_id)
                .fetch_optional(&mut *tx)
                .await?;
        if customer.is_none() {
            problems.push("Customer not found".to_string());
        }

        if let Some(address_id) = order.shipping_address_id {
            let owned: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM shop.addresses WHERE id = $1 AND customer_id = $2)",
            )
            .bind(address_id)
            .bind(order.customer_id)
            .fetch_one(&mut *tx)
            .await?;
            if !owned {
                problems.push("Shipping address does not belong to the customer".to_string());
            }
        }

        let product_ids: Vec<i32> = order.items.iter().map(|i| i.product_id.as_i32()).collect();
        let locked = sqlx::query_as::<_, LockedProductRow>(
            r"
            SELECT id, name, price, stock, is_active
            FROM shop.products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            ",
        )
        .bind(&product_ids)
        .fetch_all(&mut *tx)
        .await?;
        let products: HashMap<i32, LockedProductRow> =
            locked.into_iter().map(|p| (p.id, p)).collect();

        let mut lines = Vec::with_capacity(order.items.len());
        for item in &order.items {
            match products.get(&item.product_id.as_i32()) {
                None => problems.push(format!("Product {} not found", item.product_id)),
                Some(p) if !p.is_active => {
                    problems.push(format!("{} is not available for sale", p.name));
                }
                Some(p) if p.stock < item.quantity => problems.push(format!(
                    "Insufficient stock for {} ({} available, {} requested)",
                    p.name, p.stock, item.quantity
                )),
                Some(p) => lines.push((item, p)),
            }
        }

        if !problems.is_empty() {
            return Err(RepositoryError::Conflict(problems.join(", ")));
        }

        let line_totals: Vec<Decimal> = lines
            .iter()
            .map(|(item, p)| line_total(p.price, item.quantity))
            .collect();
        let totals = price_order(&line_totals, order.shipping_fee, order.tax);

        let (order_id, number) = insert_with_number(
            &mut tx,
            Utc::now().date_naive(),
            order,
            &totals,
        )
        .await?;

        let reason = format!("Order {number}");
        for ((item, product), total) in lines.iter().zip(&line_totals) {
            sqlx::query(
                r"
                INSERT INTO shop.order_items (order_id, product_id, quantity, price, total)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(product.price)
            .bind(total)
            .execute(&mut *tx)
            .await?;

            let after = product.stock - item.quantity;
            sqlx::query("UPDATE shop.products SET stock = $2, updated_at = NOW() WHERE id = $1")
                .bind(item.product_id)
                .bind(after)
                .execute(&mut *tx)
                .await?;

            record_stock_change(
                &mut tx,
                item.product_id,
                StockChangeKind::Sale,
                &reason,
                product.stock,
                after,
            )
            .await?;
        }

        let detail = fetch_detail(&mut tx, order_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            order_number = %number,
            total = %totals.total,
            "Order created"
        );
        Ok(detail)
    }

    /// Move an order to a new status and/or payment status.
    ///
    /// Delivery stamps `delivered_at`. Cancellation puts every line back
    /// into stock with a return record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if the transition is not allowed.
    pub async fn update_status(
        &self,
        id: OrderId,
        change: StatusChange,
    ) -> Result<OrderDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(OrderStatus, String)> = sqlx::query_as(
            "SELECT status, order_number FROM shop.orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((current, number)) = current else {
            return Err(RepositoryError::NotFound);
        };

        if let Some(next) = change.status.filter(|next| *next != current) {
            if !current.can_transition_to(next) {
                return Err(RepositoryError::Conflict(format!(
                    "Cannot change order status from {current} to {next}"
                )));
            }

            if next == OrderStatus::Cancelled {
                let items = sqlx::query_as::<_, LockedItemRow>(
                    r"
                    SELECT oi.product_id, oi.quantity, p.stock
                    FROM shop.order_items oi
                    JOIN shop.products p ON p.id = oi.product_id
                    WHERE oi.order_id = $1
                    ORDER BY oi.product_id
                    FOR UPDATE OF p
                    ",
                )
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

                let reason = format!("Order {number} cancelled");
                for item in items {
                    let product_id = ProductId::new(item.product_id);
                    let after = item.stock + item.quantity;
                    sqlx::query(
                        "UPDATE shop.products SET stock = $2, updated_at = NOW() WHERE id = $1",
                    )
                    .bind(product_id)
                    .bind(after)
                    .execute(&mut *tx)
                    .await?;

                    record_stock_change(
                        &mut tx,
                        product_id,
                        StockChangeKind::Return,
                        &reason,
                        item.stock,
                        after,
                    )
                    .await?;
                }
            }

            sqlx::query(
                r"
                UPDATE shop.orders
                SET status = $2,
                    delivered_at = CASE WHEN $2 = 'delivered'::shop.order_status
                                        THEN NOW() ELSE delivered_at END,
                    updated_at = NOW()
                WHERE id = $1
                ",
            )
            .bind(id)
            .bind(next)
            .execute(&mut *tx)
            .await?;

            tracing::info!(order_id = %id, from = %current, to = %next, "Order status changed");
        }

        if let Some(payment_status) = change.payment_status {
            sqlx::query(
                "UPDATE shop.orders SET payment_status = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .bind(payment_status)
            .execute(&mut *tx)
            .await?;
        }

        let detail = fetch_detail(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;
        Ok(detail)
    }
}
