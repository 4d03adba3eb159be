//! Bazaar Core - Shared domain types.
//!
//! Used by every Bazaar component:
//! - `storefront` - The shop HTTP API, checkout and admin dashboard
//! - `cli` - Migrations, seeding and staff account management
//!
//! # Architecture
//!
//! No I/O lives here: no database access, no HTTP clients. Anything that needs
//! to be shared between the server and the CLI, or that is pure business
//! arithmetic worth unit testing on its own, belongs in this crate.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, money, order and address enums
//! - [`pricing`] - Coupon validity and discount arithmetic
//! - [`pagination`] - Page number clamping for listing endpoints

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pagination;
pub mod pricing;
pub mod types;

pub use pagination::Page;
pub use pricing::{CouponTerms, Discounted};
pub use types::*;
