//! Dashboard, report, and rollup API handlers.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{Datelike, Days, NaiveDate, Utc};
use serde::Deserialize;
use tracing::instrument;

use shopdesk_core::analytics::validate_year;

use crate::{
    api::{ApiResponse, ApiResult},
    error::{ApiJson, ApiQuery, AppError},
    middleware::RequireAdmin,
    models::{CustomerAnalytics, DashboardData, LowStockAlerts, SalesReport, TopProduct},
    services::{DashboardService, RollupError, RollupOutcome, SalesRollupService},
    state::AppState,
};

/// Default number of best sellers.
const DEFAULT_TOP_PRODUCTS: i64 = 5;

/// Largest number of best sellers a client may request.
const MAX_TOP_PRODUCTS: i64 = 50;

/// Days covered by a sales report when no range is given.
const DEFAULT_REPORT_DAYS: u64 = 30;

/// Longest sales report range.
const MAX_REPORT_DAYS: i64 = 366;

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard", get(overview))
        .route("/api/dashboard/low-stock", get(low_stock))
        .route("/api/dashboard/top-products", get(top_products))
        .route("/api/dashboard/customers", get(customers))
        .route("/api/reports/sales", get(sales_report))
        .route("/api/sales/rollup", post(run_rollup))
}

/// `?year=` query.
#[derive(Debug, Default, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

/// `?limit=` query.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// `?start&end` query, both `YYYY-MM-DD`.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ReportQuery {
    /// Resolve the range. Defaults to the 30 days ending `today`.
    fn range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), AppError> {
        let end = self.end.unwrap_or(today);
        let start = self.start.unwrap_or_else(|| {
            end.checked_sub_days(Days::new(DEFAULT_REPORT_DAYS - 1))
                .unwrap_or(end)
        });

        if start > end {
            return Err(AppError::BadRequest(
                "start must not be after end".to_string(),
            ));
        }
        if (end - start).num_days() >= MAX_REPORT_DAYS {
            return Err(AppError::BadRequest(format!(
                "Report range is limited to {MAX_REPORT_DAYS} days"
            )));
        }
        Ok((start, end))
    }
}

/// `{"date": "YYYY-MM-DD"}` body.
#[derive(Debug, Deserialize)]
pub struct RollupRequest {
    pub date: NaiveDate,
}

impl From<RollupError> for AppError {
    fn from(err: RollupError) -> Self {
        match err {
            RollupError::InvalidRange(msg) => Self::BadRequest(msg),
            RollupError::Repository(e) => Self::Database(e),
        }
    }
}

/// Monthly chart, category breakdown, and KPI cards for one year.
#[instrument(skip_all)]
pub async fn overview(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<YearQuery>,
) -> ApiResult<DashboardData> {
    let today = Utc::now().date_naive();
    let year = validate_year(query.year.unwrap_or(today.year()), today.year())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let data = DashboardService::new(state.pool())
        .dashboard(year, today, state.config().service_start_year)
        .await?;
    Ok(Json(ApiResponse::ok(data)))
}

/// Active products at or below the configured stock limit.
#[instrument(skip_all)]
pub async fn low_stock(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<LowStockAlerts> {
    let alerts = DashboardService::new(state.pool())
        .low_stock(state.config().low_stock_limit)
        .await?;
    Ok(Json(ApiResponse::ok(alerts)))
}

/// Best sellers over delivered orders.
#[instrument(skip_all)]
pub async fn top_products(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Vec<TopProduct>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TOP_PRODUCTS)
        .clamp(1, MAX_TOP_PRODUCTS);
    let products = DashboardService::new(state.pool())
        .top_products(limit)
        .await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// Customer counters.
#[instrument(skip_all)]
pub async fn customers(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<CustomerAnalytics> {
    let analytics = DashboardService::new(state.pool())
        .customers(Utc::now())
        .await?;
    Ok(Json(ApiResponse::ok(analytics)))
}

/// Sales report over a date range.
#[instrument(skip_all)]
pub async fn sales_report(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<SalesReport> {
    let (start, end) = query.range(Utc::now().date_naive())?;
    let report = DashboardService::new(state.pool())
        .sales_report(start, end)
        .await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// Recompute the rollup rows for one date.
#[instrument(skip_all)]
pub async fn run_rollup(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RollupRequest>,
) -> ApiResult<RollupOutcome> {
    let outcome = SalesRollupService::new(state.pool())
        .run(request.date)
        .await?;
    tracing::info!(date = %request.date, user_id = %user.id, "Rollup requested");
    Ok(Json(ApiResponse::ok(outcome).with_message("Sales rollup completed")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_report_range_defaults_to_last_30_days() {
        let (start, end) = ReportQuery::default().range(date(2025, 3, 31)).unwrap();
        assert_eq!(end, date(2025, 3, 31));
        assert_eq!(start, date(2025, 3, 2));
    }

    #[test]
    fn test_report_range_rejects_reversed_and_long_ranges() {
        let reversed = ReportQuery {
            start: Some(date(2025, 3, 2)),
            end: Some(date(2025, 3, 1)),
        };
        assert!(matches!(
            reversed.range(date(2025, 3, 31)),
            Err(AppError::BadRequest(_))
        ));

        let long = ReportQuery {
            start: Some(date(2023, 1, 1)),
            end: Some(date(2025, 1, 1)),
        };
        assert!(long.range(date(2025, 3, 31)).is_err());

        let single_day = ReportQuery {
            start: Some(date(2025, 3, 1)),
            end: Some(date(2025, 3, 1)),
        };
        assert_eq!(
            single_day.range(date(2025, 3, 31)).unwrap(),
            (date(2025, 3, 1), date(2025, 3, 1))
        );
    }

    #[test]
    fn test_rollup_errors_map_to_status() {
        let err: AppError = RollupError::InvalidRange("bad".into()).into();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
