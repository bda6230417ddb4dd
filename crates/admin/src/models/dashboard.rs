//! Dashboard and report response types.
//!
//! Chart and KPI figures serialize as JSON numbers; report rows keep the
//! string-encoded decimals used everywhere else.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use shopdesk_core::analytics::{CategorySlice, DailyBucket, MonthlySales, ReportSummary};
use shopdesk_core::{CategoryId, ProductId, StockStatus};

/// `GET /api/dashboard` payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub monthly_sales: Vec<MonthlySales>,
    pub category_data: Vec<CategorySlice>,
    pub kpis: DashboardKpis,
    pub available_years: Vec<i32>,
    pub selected_year: i32,
}

/// Headline numbers for the dashboard cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardKpis {
    #[serde(with = "rust_decimal::serde::float")]
    pub today_sales: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_total: Decimal,
    pub monthly_orders: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub yearly_total: Decimal,
    pub yearly_orders: i64,
    /// `yearly_total / yearly_orders` for the selected year.
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_order_value: Decimal,
    /// All-time sales.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_sales: Decimal,
    /// Percent of customers with more than one delivered order.
    pub repeat_rate: i64,
}

/// A product that needs restocking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockAlert {
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub category_name: String,
    pub stock_status: StockStatus,
}

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Error,
}

/// Human-readable notification derived from a [`LowStockAlert`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockNotice {
    pub product_id: ProductId,
    pub stock_status: StockStatus,
    pub severity: AlertSeverity,
    pub message: String,
}

impl From<&LowStockAlert> for StockNotice {
    fn from(alert: &LowStockAlert) -> Self {
        let (severity, message) = if alert.stock_status == StockStatus::OutOfStock {
            (AlertSeverity::Error, format!("{} is out of stock", alert.name))
        } else {
            (
                AlertSeverity::Warning,
                format!("{} is running low ({} left)", alert.name, alert.stock),
            )
        };
        Self {
            product_id: alert.product_id,
            stock_status: alert.stock_status,
            severity,
            message,
        }
    }
}

/// `GET /api/dashboard/low-stock` payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockAlerts {
    pub low_stock: Vec<LowStockAlert>,
    pub out_of_stock: Vec<LowStockAlert>,
    pub alerts: Vec<StockNotice>,
}

impl LowStockAlerts {
    /// Split active restock candidates into low and out-of-stock lists.
    #[must_use]
    pub fn from_products(products: Vec<LowStockAlert>) -> Self {
        let (out_of_stock, low_stock): (Vec<_>, Vec<_>) = products
            .into_iter()
            .partition(|p| p.stock_status == StockStatus::OutOfStock);
        let alerts = low_stock
            .iter()
            .chain(out_of_stock.iter())
            .map(StockNotice::from)
            .collect();
        Self {
            low_stock,
            out_of_stock,
            alerts,
        }
    }
}

/// Best seller over delivered orders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub total_quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_sales: Decimal,
}

/// `GET /api/dashboard/customers` payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAnalytics {
    pub total: i64,
    pub new_this_month: i64,
    /// Ordered within the last 90 days.
    pub active: i64,
    pub inactive: i64,
}

impl CustomerAnalytics {
    /// Derive `inactive` from the other counters.
    #[must_use]
    pub const fn new(total: i64, new_this_month: i64, active: i64) -> Self {
        Self {
            total,
            new_this_month,
            active,
            inactive: total.saturating_sub(active),
        }
    }
}

/// One category's sales on one day of a report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReportRow {
    pub date: NaiveDate,
    pub category_id: CategoryId,
    pub category_name: String,
    pub sales: Decimal,
    pub orders: i32,
    pub items: i32,
}

/// `GET /api/reports/sales` payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub daily_sales: Vec<DailyBucket>,
    pub category_sales: Vec<CategoryReportRow>,
    pub top_products: Vec<TopProduct>,
    pub summary: ReportSummary,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn alert(id: i32, stock: i32) -> LowStockAlert {
        LowStockAlert {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            sku: None,
            stock,
            low_stock_threshold: 10,
            category_name: "Food".into(),
            stock_status: StockStatus::from_levels(stock, 10),
        }
    }

    #[test]
    fn test_alerts_are_partitioned() {
        let alerts = LowStockAlerts::from_products(vec![alert(1, 0), alert(2, 3), alert(3, 8)]);
        assert_eq!(alerts.low_stock.len(), 2);
        assert_eq!(alerts.out_of_stock.len(), 1);
        assert_eq!(alerts.alerts.len(), 3);
        assert_eq!(alerts.alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(alerts.alerts[0].message, "Product 2 is running low (3 left)");
        assert_eq!(alerts.alerts[2].severity, AlertSeverity::Error);
        assert_eq!(alerts.alerts[2].message, "Product 1 is out of stock");
    }

    #[test]
    fn test_kpis_serialize_as_numbers() {
        let kpis = DashboardKpis {
            yearly_total: Decimal::new(123_450, 1),
            yearly_orders: 3,
            avg_order_value: Decimal::new(411_500, 2),
            ..DashboardKpis::default()
        };
        let json = serde_json::to_value(kpis).unwrap();
        assert_eq!(json["yearlyTotal"], serde_json::json!(12345.0));
        assert_eq!(json["avgOrderValue"], serde_json::json!(4115.0));
        assert_eq!(json["repeatRate"], 0);
    }

    #[test]
    fn test_customer_analytics_inactive() {
        let analytics = CustomerAnalytics::new(120, 8, 45);
        assert_eq!(analytics.inactive, 75);
    }
}
