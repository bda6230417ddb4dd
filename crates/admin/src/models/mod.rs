//! Domain models for the admin API.
//!
//! Response types serialize in camelCase. Input types keep every field
//! optional so that validation can report all problems at once instead of
//! failing on the first missing key.

pub mod category;
pub mod customer;
pub mod dashboard;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

use rust_decimal::Decimal;

pub use category::{Category, CategoryInput, NewCategory};
pub use customer::{
    Address, AddressInput, Customer, CustomerDetail, CustomerInput, CustomerSummary, NewAddress,
    NewCustomer,
};
pub use dashboard::{
    CategoryReportRow, CustomerAnalytics, DashboardData, DashboardKpis, LowStockAlert,
    LowStockAlerts, SalesReport, TopProduct,
};
pub use order::{
    NewOrder, NewOrderItem, Order, OrderDetail, OrderInput, OrderItem, OrderListItem,
    StatusCounts, StatusUpdateInput,
};
pub use product::{
    CategoryRef, NewProduct, Product, ProductFilter, ProductInput, ProductStats,
    StockHistoryEntry,
};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;

/// Trimmed, non-empty value of an optional text field.
pub(crate) fn required_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

/// Trimmed optional text; blank becomes `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_owned())
    })
}

/// Decimal places kept by the `NUMERIC(12, 2)` money columns.
pub const MONEY_SCALE: u32 = 2;

/// Exclusive upper bound of a `NUMERIC(12, 2)` column (10^10).
pub const MONEY_LIMIT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Problem with a money amount the database could not store as given.
pub(crate) fn money_problem(label: &str, value: Decimal) -> Option<String> {
    if value.normalize().scale() > MONEY_SCALE {
        Some(format!("{label} must have at most {MONEY_SCALE} decimal places"))
    } else if value.abs() >= MONEY_LIMIT {
        Some(format!("{label} must be less than {MONEY_LIMIT}"))
    } else {
        None
    }
}
