//! Customer and address repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use shopdesk_core::{AddressId, CustomerId, Email};

use super::{RepositoryError, like_pattern};
use crate::models::customer::ACTIVE_WINDOW_DAYS;
use crate::models::{Address, Customer, CustomerDetail, CustomerSummary, NewAddress, NewCustomer};

/// Message for a create or update that collides with an existing email.
pub const DUPLICATE_EMAIL: &str = "A customer with this email already exists";

/// Message for deleting a customer with order history.
pub const HAS_ORDERS: &str = "Cannot delete a customer who has orders";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    email: String,
    name: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: CustomerId::new(row.id),
            email,
            name: row.name,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerSummaryRow {
    #[sqlx(flatten)]
    customer: CustomerRow,
    order_count: i64,
    total_spent: Decimal,
    last_order_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl TryFrom<CustomerSummaryRow> for CustomerSummary {
    type Error = RepositoryError;

    fn try_from(row: CustomerSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            customer: row.customer.try_into()?,
            order_count: row.order_count,
            total_spent: row.total_spent,
            last_order_at: row.last_order_at,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i32,
    customer_id: i32,
    name: String,
    zip_code: String,
    prefecture: String,
    city: String,
    address1: String,
    address2: Option<String>,
    phone: Option<String>,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            name: row.name,
            zip_code: row.zip_code,
            prefecture: row.prefecture,
            city: row.city,
            address1: row.address1,
            address2: row.address2,
            phone: row.phone,
            is_default: row.is_default,
            created_at: row.created_at,
        }
    }
}

const CUSTOMER_COLUMNS: &str = "id, email, name, phone, created_at, updated_at";

const ADDRESS_COLUMNS: &str =
    "id, customer_id, name, zip_code, prefecture, city, address1, address2, phone, is_default, created_at";

// $1 is the activity window in days.
const SELECT_SUMMARY: &str = r"
    SELECT c.id, c.email, c.name, c.phone, c.created_at, c.updated_at,
           COUNT(o.id) AS order_count,
           COALESCE(SUM(o.total) FILTER (WHERE o.status = 'delivered'), 0) AS total_spent,
           MAX(o.created_at) AS last_order_at,
           COALESCE(MAX(o.created_at) >= NOW() - make_interval(days => $1), FALSE) AS is_active
    FROM shop.customers c
    LEFT JOIN shop.orders o ON o.customer_id = c.id
";

const SEARCH_CLAUSE: &str = r"
    WHERE ($2::text IS NULL OR c.name ILIKE $2 OR c.email ILIKE $2 OR c.phone ILIKE $2)
";

// =============================================================================
// Repository
// =============================================================================

/// Repository for customer database operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of customers with order aggregates, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CustomerSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerSummaryRow>(&format!(
            "{SELECT_SUMMARY} {SEARCH_CLAUSE}
             GROUP BY c.id
             ORDER BY c.created_at DESC, c.id DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(ACTIVE_WINDOW_DAYS)
        .bind(search.map(like_pattern))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Number of customers matching `search`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, search: Option<&str>) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM shop.customers c
            WHERE ($1::text IS NULL OR c.name ILIKE $1 OR c.email ILIKE $1 OR c.phone ILIKE $1)
            ",
        )
        .bind(search.map(like_pattern))
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Customer with aggregates and addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_detail(
        &self,
        id: CustomerId,
    ) -> Result<Option<CustomerDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerSummaryRow>(&format!(
            "{SELECT_SUMMARY} WHERE c.id = $2 GROUP BY c.id"
        ))
        .bind(ACTIVE_WINDOW_DAYS)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(CustomerDetail {
            summary: row.try_into()?,
            addresses: self.addresses(id).await?,
        }))
    }

    /// Addresses of a customer, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn addresses(&self, id: CustomerId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM shop.addresses
             WHERE customer_id = $1
             ORDER BY is_default DESC, created_at, id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Whether another customer already uses `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_taken(
        &self,
        email: &Email,
        excluding: Option<CustomerId>,
    ) -> Result<bool, RepositoryError> {
        let taken: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM shop.customers
                WHERE email = $1 AND ($2::int IS NULL OR id <> $2)
            )
            ",
        )
        .bind(email.as_str())
        .bind(excluding)
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already used.
    pub async fn create(&self, input: &NewCustomer) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "INSERT INTO shop.customers (email, name, phone)
             VALUES ($1, $2, $3)
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(input.email.as_str())
        .bind(&input.name)
        .bind(&input.phone)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, DUPLICATE_EMAIL))?;

        row.try_into()
    }

    /// Replace a customer's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    /// Returns `RepositoryError::Conflict` if the email is already used.
    pub async fn update(
        &self,
        id: CustomerId,
        input: &NewCustomer,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "UPDATE shop.customers
             SET email = $2, name = $3, phone = $4, updated_at = NOW()
             WHERE id = $1
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(id)
        .bind(input.email.as_str())
        .bind(&input.name)
        .bind(&input.phone)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, DUPLICATE_EMAIL))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Delete a customer without orders. Addresses go with it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    /// Returns `RepositoryError::Conflict` if the customer has orders.
    pub async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let found: Option<i32> =
            sqlx::query_scalar("SELECT id FROM shop.customers WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if found.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let has_orders: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM shop.orders WHERE customer_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if has_orders {
            return Err(RepositoryError::Conflict(HAS_ORDERS.to_string()));
        }

        sqlx::query("DELETE FROM shop.customers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Add an address. A customer's first address, or one flagged as
    /// default, becomes the only default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    pub async fn add_address(
        &self,
        customer_id: CustomerId,
        input: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let found: Option<i32> =
            sqlx::query_scalar("SELECT id FROM shop.customers WHERE id = $1 FOR UPDATE")
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await?;
        if found.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.addresses WHERE customer_id = $1")
                .bind(customer_id)
                .fetch_one(&mut *tx)
                .await?;
        let is_default = input.is_default || existing == 0;

        if is_default {
            sqlx::query(
                "UPDATE shop.addresses SET is_default = FALSE WHERE customer_id = $1 AND is_default",
            )
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "INSERT INTO shop.addresses
                 (customer_id, name, zip_code, prefecture, city, address1, address2, phone, is_default)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(customer_id)
        .bind(&input.name)
        .bind(&input.zip_code)
        .bind(&input.prefecture)
        .bind(&input.city)
        .bind(&input.address1)
        .bind(&input.address2)
        .bind(&input.phone)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }
}
