//! Shopdesk Core - Shared types library.
//!
//! This crate provides the domain types used across all Shopdesk components:
//! - `admin` - The admin HTTP API
//! - `cli` - Command-line tools for migrations, user bootstrap and sales rollups
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Repositories load rows, and the reducers in [`analytics`]
//! turn them into rollup buckets and dashboard figures.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and statuses
//! - [`analytics`] - Sales rollup, dashboard and order pricing calculations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod types;

pub use types::*;
