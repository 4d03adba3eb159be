//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Username/password accounts (Argon2id)
//! - `cart` - Cart resolution for sessions and users, cart totals
//! - `checkout` - Gateway order creation and payment confirmation
//! - `email` - Order confirmation mail over SMTP
//! - `media` - Product image uploads on local disk
//! - `payment` - Razorpay Orders API client and signature checks

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod media;
pub mod payment;

pub use auth::{AuthError, AuthService};
pub use checkout::{CheckoutError, CheckoutService};
pub use email::{EmailError, EmailService};
pub use media::{ImageUpload, MediaError};
pub use payment::{GatewayError, RazorpayClient};
