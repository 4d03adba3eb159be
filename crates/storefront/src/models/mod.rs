//! Domain models for the storefront.
//!
//! Row types derive `sqlx::FromRow` and are read with runtime `query_as`;
//! response shapes that differ from the rows live next to the handlers that
//! produce them.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod review;
pub mod session;
pub mod user;
pub mod wishlist;

pub use address::Address;
pub use cart::{Cart, CartLine, Coupon};
pub use catalog::{Category, CategoryRef, Product, ProductListing, ProductView};
pub use order::{Order, OrderItem, OrderSummary, Payment};
pub use review::{Review, ReviewView, ReviewWithAuthor};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
pub use wishlist::WishlistEntry;
