//! Sales aggregation.
//!
//! Everything here is a pure function over rows the admin repositories have
//! already loaded:
//!
//! - [`rollup`] - fold one day's delivered orders into `daily_sales` and
//!   `category_sales` buckets
//! - [`dashboard`] - month filling, yearly totals, KPIs and category breakdown
//! - [`pricing`] - order subtotal, shipping, tax and total

pub mod dashboard;
pub mod pricing;
pub mod rollup;

pub use dashboard::{
    CategorySlice, MonthlySales, ReportSummary, YearOutOfRange, YearTotals, available_years,
    average_order_value, category_breakdown, fill_months, repeat_rate, summarize_report,
    validate_year, year_totals,
};
pub use pricing::{OrderTotals, line_total, price_order};
pub use rollup::{CategoryBucket, DailyBucket, DeliveredItem, DeliveredOrder, Rollup, build_rollup};
