//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Email and password authentication with Argon2id hashes
//! - `dashboard` - Dashboard KPIs, alerts and sales reports
//! - `sales_rollup` - Daily sales aggregation into the rollup tables

pub mod auth;
pub mod dashboard;
pub mod sales_rollup;

pub use auth::{AuthError, AuthService};
pub use dashboard::DashboardService;
pub use sales_rollup::{RollupError, RollupOutcome, SalesRollupService};
