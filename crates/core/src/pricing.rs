//! Cart pricing: subtotals and percentage coupons.
//!
//! A coupon only counts while it is active and `valid_from <= now <= valid_to`.
//! The discount is truncated to whole currency units, so a 15% coupon on
//! `99.99` takes off `14`, not `14.9985`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// The parts of a coupon row that affect price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponTerms {
    /// Percent off, 0 to 100.
    pub discount_percent: i32,
    pub active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

impl CouponTerms {
    #[must_use]
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.valid_from <= now && now <= self.valid_to
    }
}

/// Result of pricing a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Discounted {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Sum of `unit_price * quantity` over the lines.
#[must_use]
pub fn subtotal<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines
        .into_iter()
        .map(|(price, quantity)| price * Decimal::from(quantity))
        .sum()
}

/// Whole-unit discount for `percent` of `subtotal`.
///
/// Percentages outside `0..=100` are clamped.
#[must_use]
pub fn percentage_discount(subtotal: Decimal, percent: i32) -> Decimal {
    let percent = Decimal::from(percent.clamp(0, 100));
    (subtotal * percent / Decimal::ONE_HUNDRED).trunc()
}

/// Price a subtotal with an optional coupon as of `now`.
#[must_use]
pub fn apply_coupon(
    subtotal: Decimal,
    coupon: Option<&CouponTerms>,
    now: DateTime<Utc>,
) -> Discounted {
    let discount = coupon
        .filter(|c| c.is_redeemable_at(now))
        .map_or(Decimal::ZERO, |c| {
            percentage_discount(subtotal, c.discount_percent)
        });

    Discounted {
        subtotal,
        discount,
        total: subtotal - discount,
    }
}
