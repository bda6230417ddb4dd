//! Dashboard and sales report assembly.
//!
//! Reads come from the rollup tables; the arithmetic lives in
//! `shopdesk_core::analytics` so it is testable without a database.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use shopdesk_core::analytics::{
    MonthlySales, available_years, average_order_value, category_breakdown, fill_months,
    repeat_rate, summarize_report, year_totals,
};

use crate::db::{ProductRepository, RepositoryError, SalesRepository};
use crate::models::{
    CustomerAnalytics, DashboardData, DashboardKpis, LowStockAlerts, SalesReport, TopProduct,
};

/// Best sellers listed in a sales report.
pub const REPORT_TOP_PRODUCTS: i64 = 10;

/// First and last day of the month containing `date`.
#[must_use]
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date.with_day(1).unwrap_or(date);
    let end = start
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.checked_sub_days(Days::new(1)))
        .unwrap_or(date);
    (start, end)
}

/// January 1st and December 31st of `year`.
#[must_use]
pub fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

/// Inputs for [`assemble_kpis`] that come straight from the database.
#[derive(Debug, Clone, Copy, Default)]
pub struct KpiInputs {
    pub today_sales: Decimal,
    pub month_sales: Decimal,
    pub month_orders: i64,
    pub all_time_sales: Decimal,
    pub repeat_customers: i64,
    pub total_customers: i64,
}

/// Compute the KPI cards. Yearly figures are the sum of the monthly series,
/// and the average order value is derived from those same sums.
#[must_use]
pub fn assemble_kpis(months: &[MonthlySales], inputs: KpiInputs) -> DashboardKpis {
    let year = year_totals(months);
    DashboardKpis {
        today_sales: inputs.today_sales,
        monthly_total: inputs.month_sales,
        monthly_orders: inputs.month_orders,
        yearly_total: year.sales,
        yearly_orders: year.orders,
        avg_order_value: average_order_value(year.sales, year.orders),
        total_sales: inputs.all_time_sales,
        repeat_rate: repeat_rate(inputs.repeat_customers, inputs.total_customers),
    }
}

/// Dashboard service.
pub struct DashboardService<'a> {
    sales: SalesRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> DashboardService<'a> {
    /// Create a new dashboard service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            sales: SalesRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// Everything the dashboard page shows for `year`.
    ///
    /// `year` must already be validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    #[instrument(skip(self))]
    pub async fn dashboard(
        &self,
        year: i32,
        today: NaiveDate,
        service_start_year: i32,
    ) -> Result<DashboardData, RepositoryError> {
        let (year_start, year_end) = year_bounds(year).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("year {year} out of calendar range"))
        })?;
        let (month_start, month_end) = month_bounds(today);

        let (
            monthly_rows,
            category_rows,
            (today_sales, _),
            (month_sales, month_orders),
            all_time_sales,
            (repeat_customers, total_customers),
            db_years,
        ) = tokio::try_join!(
            self.sales.monthly_sales(year),
            self.sales.categories_between(year_start, year_end),
            self.sales.totals_between(today, today),
            self.sales.totals_between(month_start, month_end),
            self.sales.all_time_sales(),
            self.sales.repeat_customers(),
            self.sales.years_with_data(),
        )?;

        let monthly_sales = fill_months(&monthly_rows);
        let kpis = assemble_kpis(
            &monthly_sales,
            KpiInputs {
                today_sales,
                month_sales,
                month_orders,
                all_time_sales,
                repeat_customers,
                total_customers,
            },
        );
        let category_data = category_breakdown(
            category_rows
                .iter()
                .map(|row| (row.category_name.as_str(), row.sales)),
        );

        Ok(DashboardData {
            monthly_sales,
            category_data,
            kpis,
            available_years: available_years(&db_years, service_start_year, today.year()),
            selected_year: year,
        })
    }

    /// Active products at or below `limit` units.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, limit: i32) -> Result<LowStockAlerts, RepositoryError> {
        let candidates = self.products.restock_candidates(limit).await?;
        Ok(LowStockAlerts::from_products(candidates))
    }

    /// Best sellers over delivered orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_products(&self, limit: i64) -> Result<Vec<TopProduct>, RepositoryError> {
        self.sales.top_products(limit).await
    }

    /// Customer counters relative to `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn customers(&self, now: DateTime<Utc>) -> Result<CustomerAnalytics, RepositoryError> {
        let (month_start, _) = month_bounds(now.date_naive());
        let month_start = month_start.and_time(chrono::NaiveTime::MIN).and_utc();
        self.sales.customer_analytics(month_start).await
    }

    /// Sales report over `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    #[instrument(skip(self))]
    pub async fn sales_report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SalesReport, RepositoryError> {
        let (daily_sales, category_sales, top_products) = tokio::try_join!(
            self.sales.daily_between(start, end),
            self.sales.categories_between(start, end),
            self.sales.top_products(REPORT_TOP_PRODUCTS),
        )?;

        let summary = summarize_report(&daily_sales);
        Ok(SalesReport {
            start,
            end,
            daily_sales,
            category_sales,
            top_products,
            summary,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            month_bounds(date(2024, 2, 14)),
            (date(2024, 2, 1), date(2024, 2, 29))
        );
        assert_eq!(
            month_bounds(date(2025, 12, 31)),
            (date(2025, 12, 1), date(2025, 12, 31))
        );
    }

    #[test]
    fn test_year_bounds() {
        assert_eq!(
            year_bounds(2025),
            Some((date(2025, 1, 1), date(2025, 12, 31)))
        );
    }

    #[test]
    fn test_yearly_kpis_match_monthly_series() {
        let months = fill_months(&[
            MonthlySales {
                month: 1,
                sales: Decimal::new(120_000, 0),
                orders: 30,
            },
            MonthlySales {
                month: 6,
                sales: Decimal::new(80_000, 0),
                orders: 20,
            },
        ]);

        let kpis = assemble_kpis(
            &months,
            KpiInputs {
                repeat_customers: 1,
                total_customers: 3,
                ..KpiInputs::default()
            },
        );

        let monthly_orders: i64 = months.iter().map(|m| m.orders).sum();
        assert_eq!(kpis.yearly_orders, monthly_orders);
        assert_eq!(kpis.yearly_total, Decimal::new(200_000, 0));
        assert_eq!(
            kpis.avg_order_value,
            kpis.yearly_total / Decimal::from(kpis.yearly_orders)
        );
        assert_eq!(kpis.repeat_rate, 33);
    }

    #[test]
    fn test_empty_year_has_zero_average() {
        let kpis = assemble_kpis(&fill_months(&[]), KpiInputs::default());
        assert_eq!(kpis.yearly_orders, 0);
        assert_eq!(kpis.avg_order_value, Decimal::ZERO);
    }
}
