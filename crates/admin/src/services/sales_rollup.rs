//! Daily sales rollup routine.
//!
//! Folds the orders delivered on a date into `daily_sales` and
//! `category_sales`. Running it twice for the same date gives the same rows.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use shopdesk_core::analytics::{DailyBucket, build_rollup};

use crate::db::{RepositoryError, SalesRepository};

/// Longest date range a single rollup request may cover.
pub const MAX_ROLLUP_DAYS: u64 = 366;

/// Errors from the rollup routine.
#[derive(Debug, Error)]
pub enum RollupError {
    /// `from` is after `to`, or the range is too long.
    #[error("invalid date range: {0}")]
    InvalidRange(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of rolling up one day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupOutcome {
    pub date: NaiveDate,
    /// `None` when nothing was delivered that day.
    pub daily: Option<DailyBucket>,
    pub categories: usize,
}

/// Runs the rollup against the database.
pub struct SalesRollupService<'a> {
    sales: SalesRepository<'a>,
}

impl<'a> SalesRollupService<'a> {
    /// Create a new rollup service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            sales: SalesRepository::new(pool),
        }
    }

    /// Roll up one day. Days without deliveries write nothing.
    ///
    /// # Errors
    ///
    /// Returns `RollupError::Repository` if a query fails.
    #[instrument(skip(self))]
    pub async fn run(&self, date: NaiveDate) -> Result<RollupOutcome, RollupError> {
        let orders = self.sales.delivered_orders_on(date).await?;

        let Some(rollup) = build_rollup(date, &orders) else {
            tracing::info!(%date, "No delivered orders, rollup skipped");
            return Ok(RollupOutcome {
                date,
                daily: None,
                categories: 0,
            });
        };

        self.sales.upsert_rollup(&rollup).await?;

        tracing::info!(
            %date,
            orders = rollup.daily.total_orders,
            total_sales = %rollup.daily.total_sales,
            categories = rollup.categories.len(),
            "Sales rollup written"
        );

        Ok(RollupOutcome {
            date,
            categories: rollup.categories.len(),
            daily: Some(rollup.daily),
        })
    }

    /// Roll up every day in `from..=to`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RollupError::InvalidRange` for a reversed or oversized range.
    /// Returns `RollupError::Repository` if a query fails; days before the
    /// failing one stay written.
    pub async fn run_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RollupOutcome>, RollupError> {
        let days = range_days(from, to)?;
        let mut outcomes = Vec::with_capacity(days.len());
        for date in days {
            outcomes.push(self.run(date).await?);
        }
        Ok(outcomes)
    }
}

/// Every date in `from..=to`.
///
/// # Errors
///
/// Returns `RollupError::InvalidRange` if `from > to` or the range exceeds
/// [`MAX_ROLLUP_DAYS`].
pub fn range_days(from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>, RollupError> {
    if from > to {
        return Err(RollupError::InvalidRange(format!(
            "{from} is after {to}"
        )));
    }
    let span = u64::try_from((to - from).num_days()).unwrap_or(u64::MAX);
    if span >= MAX_ROLLUP_DAYS {
        return Err(RollupError::InvalidRange(format!(
            "at most {MAX_ROLLUP_DAYS} days per run"
        )));
    }

    Ok((0..=span)
        .filter_map(|offset| from.checked_add_days(Days::new(offset)))
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_days_inclusive() {
        let days = range_days(date(2025, 2, 27), date(2025, 3, 2)).unwrap();
        assert_eq!(
            days,
            vec![
                date(2025, 2, 27),
                date(2025, 2, 28),
                date(2025, 3, 1),
                date(2025, 3, 2)
            ]
        );
        assert_eq!(range_days(date(2025, 1, 1), date(2025, 1, 1)).unwrap().len(), 1);
    }

    #[test]
    fn test_range_days_rejects_bad_ranges() {
        assert!(matches!(
            range_days(date(2025, 3, 2), date(2025, 3, 1)),
            Err(RollupError::InvalidRange(_))
        ));
        assert!(matches!(
            range_days(date(2024, 1, 1), date(2025, 1, 1)),
            Err(RollupError::InvalidRange(_))
        ));
        assert!(range_days(date(2025, 1, 1), date(2025, 12, 31)).is_ok());
    }
}
