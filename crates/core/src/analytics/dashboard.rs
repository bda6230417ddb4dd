//! Dashboard figures derived from the rollup tables.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::rollup::DailyBucket;

/// Earliest year the dashboard accepts.
pub const MIN_DASHBOARD_YEAR: i32 = 2020;

/// Color used for categories without an assigned one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#6B7280";

const CATEGORY_COLORS: &[(&str, &str)] = &[
    ("clothing", "#10B981"),
    ("food", "#F59E0B"),
    ("electronics", "#8B5CF6"),
    ("other", "#06B6D4"),
];

/// Sales for one month of the selected year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySales {
    /// 1 = January.
    pub month: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub sales: Decimal,
    pub orders: i64,
}

impl MonthlySales {
    /// An empty month.
    #[must_use]
    pub const fn zero(month: u32) -> Self {
        Self {
            month,
            sales: Decimal::ZERO,
            orders: 0,
        }
    }
}

/// Pad per-month rows out to a full January..December series.
///
/// Months missing from `rows` are zero-filled; rows outside 1..=12 are ignored.
#[must_use]
pub fn fill_months(rows: &[MonthlySales]) -> Vec<MonthlySales> {
    (1..=12)
        .map(|month| {
            rows.iter()
                .find(|row| row.month == month)
                .cloned()
                .unwrap_or_else(|| MonthlySales::zero(month))
        })
        .collect()
}

/// Sales and order totals over a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct YearTotals {
    pub sales: Decimal,
    pub orders: i64,
}

/// Yearly totals as the sum of the monthly series.
///
/// Deriving the year from the months keeps the KPI cards and the chart from
/// ever disagreeing.
#[must_use]
pub fn year_totals(months: &[MonthlySales]) -> YearTotals {
    months.iter().fold(YearTotals::default(), |acc, m| YearTotals {
        sales: acc.sales + m.sales,
        orders: acc.orders + m.orders,
    })
}

/// Total sales divided by order count for the same period, rounded to cents
/// (`round_dp`, midpoints to even) to match the money columns. The exact
/// quotient differs from this by at most half a cent. Zero without orders.
#[must_use]
pub fn average_order_value(sales: Decimal, orders: i64) -> Decimal {
    if orders <= 0 {
        return Decimal::ZERO;
    }
    (sales / Decimal::from(orders)).round_dp(2)
}

/// Percentage (0-100, rounded half up) of customers with more than one
/// delivered order.
#[must_use]
pub fn repeat_rate(repeat_customers: i64, total_customers: i64) -> i64 {
    if total_customers <= 0 || repeat_customers <= 0 {
        return 0;
    }
    (repeat_customers * 200 + total_customers) / (total_customers * 2)
}

/// One slice of the category pie chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySlice {
    pub name: String,
    /// Sales in thousands, rounded.
    pub value: i64,
    pub color: String,
}

/// Sum per-day category sales by category name into chart slices.
///
/// Slices are ordered by sales descending, then name.
#[must_use]
pub fn category_breakdown<'a, I>(rows: I) -> Vec<CategorySlice>
where
    I: IntoIterator<Item = (&'a str, Decimal)>,
{
    let mut totals: HashMap<&str, Decimal> = HashMap::new();
    for (name, sales) in rows {
        *totals.entry(name).or_default() += sales;
    }

    let mut totals: Vec<_> = totals.into_iter().collect();
    totals.sort_by(|(a_name, a), (b_name, b)| b.cmp(a).then_with(|| a_name.cmp(b_name)));

    totals
        .into_iter()
        .map(|(name, sales)| CategorySlice {
            name: name.to_owned(),
            value: in_thousands(sales),
            color: category_color(name).to_owned(),
        })
        .collect()
}

fn in_thousands(sales: Decimal) -> i64 {
    (sales / Decimal::ONE_THOUSAND)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or_default()
}

/// Chart color for a category name (case-insensitive).
#[must_use]
pub fn category_color(name: &str) -> &'static str {
    CATEGORY_COLORS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name.trim()))
        .map_or(DEFAULT_CATEGORY_COLOR, |(_, color)| *color)
}

/// Years offered in the dashboard's year picker, newest first.
///
/// Includes years with rollup data between [`MIN_DASHBOARD_YEAR`] and
/// `current_year`, plus every year from `service_start_year` to
/// `current_year` even when it has no data yet.
#[must_use]
pub fn available_years(db_years: &[i32], service_start_year: i32, current_year: i32) -> Vec<i32> {
    let mut years: BTreeSet<i32> = db_years
        .iter()
        .copied()
        .filter(|y| (MIN_DASHBOARD_YEAR..=current_year).contains(y))
        .collect();
    years.extend(service_start_year.max(MIN_DASHBOARD_YEAR)..=current_year);
    years.into_iter().rev().collect()
}

/// Requested dashboard year outside the accepted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error(
    "Invalid year parameter - only {min}-{current_year} are allowed",
    min = MIN_DASHBOARD_YEAR
)]
pub struct YearOutOfRange {
    pub current_year: i32,
}

/// Accept `year` if it is within `MIN_DASHBOARD_YEAR..=current_year`.
///
/// # Errors
///
/// Returns [`YearOutOfRange`] for years before 2020 or in the future.
pub const fn validate_year(year: i32, current_year: i32) -> Result<i32, YearOutOfRange> {
    if year < MIN_DASHBOARD_YEAR || year > current_year {
        return Err(YearOutOfRange { current_year });
    }
    Ok(year)
}

/// Headline figures for a sales report period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_sales: Decimal,
    pub total_orders: i64,
    pub average_order_value: Decimal,
}

/// Summarize a range of daily buckets.
#[must_use]
pub fn summarize_report(days: &[DailyBucket]) -> ReportSummary {
    let total_sales: Decimal = days.iter().map(|d| d.total_sales).sum();
    let total_orders: i64 = days.iter().map(|d| i64::from(d.total_orders)).sum();
    ReportSummary {
        total_sales,
        total_orders,
        average_order_value: average_order_value(total_sales, total_orders),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn month(month: u32, sales: i64, orders: i64) -> MonthlySales {
        MonthlySales {
            month,
            sales: Decimal::from(sales),
            orders,
        }
    }

    #[test]
    fn test_fill_months_pads_to_twelve() {
        let filled = fill_months(&[month(3, 1000, 2), month(11, 500, 1)]);
        assert_eq!(filled.len(), 12);
        assert_eq!(filled[0], MonthlySales::zero(1));
        assert_eq!(filled[2], month(3, 1000, 2));
        assert_eq!(filled[10], month(11, 500, 1));
        assert!(filled.iter().map(|m| m.month).eq(1..=12));
    }

    #[test]
    fn test_year_totals_equal_sum_of_months() {
        let months = fill_months(&[month(1, 1200, 3), month(2, 800, 2), month(12, 50, 1)]);
        let totals = year_totals(&months);
        assert_eq!(totals.orders, months.iter().map(|m| m.orders).sum::<i64>());
        assert_eq!(totals.orders, 6);
        assert_eq!(totals.sales, Decimal::from(2050));
    }

    #[test]
    fn test_average_order_value() {
        assert_eq!(average_order_value(Decimal::from(9000), 4), Decimal::from(2250));
        assert_eq!(average_order_value(Decimal::from(100), 3), Decimal::new(3333, 2));
        assert_eq!(average_order_value(Decimal::from(9000), 0), Decimal::ZERO);

        let (sales, orders) = (Decimal::new(1_000_001, 2), 7);
        let exact = sales / Decimal::from(orders);
        assert!((average_order_value(sales, orders) - exact).abs() <= Decimal::new(5, 3));
    }

    #[test]
    fn test_repeat_rate_rounds_half_up() {
        assert_eq!(repeat_rate(1, 3), 33);
        assert_eq!(repeat_rate(1, 8), 13);
        assert_eq!(repeat_rate(2, 3), 67);
        assert_eq!(repeat_rate(5, 5), 100);
        assert_eq!(repeat_rate(0, 10), 0);
        assert_eq!(repeat_rate(3, 0), 0);
    }

    #[test]
    fn test_category_breakdown_sums_by_name() {
        let rows = vec![
            ("Clothing", Decimal::from(12_400)),
            ("Food", Decimal::from(3_000)),
            ("Clothing", Decimal::from(600)),
            ("Garden", Decimal::from(1_500)),
        ];

        let slices = category_breakdown(rows);
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0].name, "Clothing");
        assert_eq!(slices[0].value, 13);
        assert_eq!(slices[0].color, "#10B981");
        assert_eq!(slices[1].name, "Food");
        assert_eq!(slices[1].value, 3);
        // 1.5 thousand rounds half up
        assert_eq!(slices[2].value, 2);
        assert_eq!(slices[2].color, DEFAULT_CATEGORY_COLOR);
    }

    #[test]
    fn test_category_color_is_case_insensitive() {
        assert_eq!(category_color("ELECTRONICS"), "#8B5CF6");
        assert_eq!(category_color("Unknown"), DEFAULT_CATEGORY_COLOR);
    }

    #[test]
    fn test_available_years() {
        assert_eq!(available_years(&[], 2025, 2026), vec![2026, 2025]);
        assert_eq!(
            available_years(&[2019, 2022, 2025, 2030], 2025, 2026),
            vec![2026, 2025, 2022]
        );
        assert_eq!(available_years(&[2026], 2025, 2026), vec![2026, 2025]);
    }

    #[test]
    fn test_validate_year() {
        assert_eq!(validate_year(2020, 2026), Ok(2020));
        assert_eq!(validate_year(2026, 2026), Ok(2026));
        let err = validate_year(2019, 2026).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid year parameter - only 2020-2026 are allowed"
        );
        assert!(validate_year(2027, 2026).is_err());
    }

    #[test]
    fn test_summarize_report_uses_period_totals() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let days = vec![
            DailyBucket {
                date,
                total_sales: Decimal::from(1000),
                total_orders: 1,
                total_items: 1,
                avg_order_value: Decimal::from(1000),
            },
            DailyBucket {
                date: date.succ_opt().unwrap(),
                total_sales: Decimal::from(2000),
                total_orders: 3,
                total_items: 5,
                avg_order_value: Decimal::new(66_667, 2),
            },
        ];

        let summary = summarize_report(&days);
        assert_eq!(summary.total_sales, Decimal::from(3000));
        assert_eq!(summary.total_orders, 4);
        assert_eq!(summary.average_order_value, Decimal::from(750));
    }
}
