//! Core types for Bazaar.
//!
//! Type-safe wrappers for the shop's domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Money, MoneyError};
pub use status::*;
