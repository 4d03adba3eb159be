//! Carts, cart lines and coupons.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{CartId, CartItemId, CouponId, CouponTerms, UserId};

use super::Product;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Cart {
    pub id: CartId,
    pub cart_token: String,
    pub user_id: Option<UserId>,
    pub coupon_id: Option<CouponId>,
    pub date_added: DateTime<Utc>,
}

/// A cart item joined with its product.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub quantity: i32,
    pub item_active: bool,
    #[sqlx(flatten)]
    pub product: Product,
}

impl CartLine {
    #[must_use]
    pub fn sub_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    /// Percent off.
    pub discount: i32,
    pub active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

impl Coupon {
    #[must_use]
    pub const fn terms(&self) -> CouponTerms {
        CouponTerms {
            discount_percent: self.discount,
            active: self.active,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
        }
    }
}
