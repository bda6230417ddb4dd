//! Core types for Shopdesk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod status;
pub mod stock;

pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
pub use stock::StockStatus;
