//! Database operations for the storefront `PostgreSQL`.
//!
//! # Schema: `bazaar`
//!
//! ## Tables
//!
//! - `user`, `user_password` - Accounts (staff flag included)
//! - `category`, `product` - Catalog
//! - `cart`, `cart_item`, `coupon` - Carts keyed by session token and/or user
//! - `order`, `payment`, `order_item` - Checkout results and item snapshots
//! - `address`, `wishlist`, `wishlist_item`, `review`
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod addresses;
pub mod carts;
pub mod catalog;
pub mod coupons;
pub mod dashboard;
pub mod orders;
pub mod reviews;
pub mod users;
pub mod wishlists;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::{AddressChanges, AddressRepository, NewAddress};
pub use carts::CartRepository;
pub use catalog::{
    AdminProductRow, CatalogRepository, NewProduct, ProductFilter, ProductSort, ProductSuggestion,
    StockStatus,
};
pub use coupons::CouponRepository;
pub use dashboard::{DailySales, DashboardRepository, DashboardStats, StatusCount};
pub use orders::{AdminOrderRow, NewOrder, OrderOwner, OrderRepository};
pub use reviews::{ReviewInput, ReviewRepository};
pub use users::{NewUser, UserRepository};
pub use wishlists::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to [`RepositoryError::Conflict`], anything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
