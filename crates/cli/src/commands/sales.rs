//! Sales rollup command.
//!
//! # Usage
//!
//! ```bash
//! # Yesterday (the usual nightly run)
//! shopdesk-cli sales rollup
//!
//! # One day
//! shopdesk-cli sales rollup --date 2025-03-14
//!
//! # A backfill range, inclusive
//! shopdesk-cli sales rollup --from 2025-03-01 --to 2025-03-31
//! ```

use chrono::{Days, NaiveDate, Utc};

use shopdesk_admin::services::{RollupOutcome, SalesRollupService};

use super::{CommandError, connect};

/// Which days to roll up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollupTarget {
    Day(NaiveDate),
    Range { from: NaiveDate, to: NaiveDate },
}

impl RollupTarget {
    /// Resolve the command-line flags. With no flags, targets yesterday.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidArgument` when `--date` is mixed with a
    /// range or only one end of the range is given.
    pub fn from_args(
        date: Option<NaiveDate>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, CommandError> {
        match (date, from, to) {
            (Some(date), None, None) => Ok(Self::Day(date)),
            (None, Some(from), Some(to)) => Ok(Self::Range { from, to }),
            (None, None, None) => Ok(Self::Day(
                today.checked_sub_days(Days::new(1)).unwrap_or(today),
            )),
            (Some(_), _, _) => Err(CommandError::InvalidArgument(
                "--date cannot be combined with --from/--to".to_string(),
            )),
            _ => Err(CommandError::InvalidArgument(
                "--from and --to must be given together".to_string(),
            )),
        }
    }
}

/// Run the rollup for `target`.
///
/// # Errors
///
/// Returns an error for an invalid range or a database failure.
pub async fn rollup(target: RollupTarget) -> Result<(), CommandError> {
    let pool = connect().await?;
    let service = SalesRollupService::new(&pool);

    let outcomes = match target {
        RollupTarget::Day(date) => vec![service.run(date).await?],
        RollupTarget::Range { from, to } => service.run_range(from, to).await?,
    };

    for outcome in &outcomes {
        log_outcome(outcome);
    }
    let written = outcomes.iter().filter(|o| o.daily.is_some()).count();
    tracing::info!(
        days = outcomes.len(),
        written,
        "Rollup finished"
    );
    Ok(())
}

fn log_outcome(outcome: &RollupOutcome) {
    match &outcome.daily {
        Some(daily) => tracing::info!(
            "{}: {} orders, {} items, sales {}, {} categories",
            outcome.date,
            daily.total_orders,
            daily.total_items,
            daily.total_sales,
            outcome.categories
        ),
        None => tracing::info!("{}: no delivered orders", outcome.date),
    }
}

/// Today's date for the default target.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_target_is_yesterday() {
        let target = RollupTarget::from_args(None, None, None, date(2025, 3, 1)).unwrap();
        assert_eq!(target, RollupTarget::Day(date(2025, 2, 28)));
    }

    #[test]
    fn test_explicit_targets() {
        let today = date(2025, 3, 20);
        assert_eq!(
            RollupTarget::from_args(Some(date(2025, 3, 14)), None, None, today).unwrap(),
            RollupTarget::Day(date(2025, 3, 14))
        );
        assert_eq!(
            RollupTarget::from_args(None, Some(date(2025, 3, 1)), Some(date(2025, 3, 5)), today)
                .unwrap(),
            RollupTarget::Range {
                from: date(2025, 3, 1),
                to: date(2025, 3, 5)
            }
        );
    }

    #[test]
    fn test_conflicting_flags_rejected() {
        let today = date(2025, 3, 20);
        assert!(
            RollupTarget::from_args(Some(today), Some(today), None, today).is_err()
        );
        assert!(RollupTarget::from_args(None, Some(today), None, today).is_err());
        assert!(RollupTarget::from_args(None, None, Some(today), today).is_err());
    }
}
