//! Cart resolution and totals.
//!
//! Every cart request first works out which cart row it is talking about.
//! Anonymous visitors are identified by a random token kept in their
//! session; logged-in users own carts directly, and a session cart built
//! up before login is claimed by the user the first time it is seen.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;

use bazaar_core::{CartItemId, Discounted, UserId, pricing};

use crate::db::{CartRepository, CouponRepository, RepositoryError};
use crate::models::{Cart, CartLine, Coupon, Product};

const CART_TOKEN_BYTES: usize = 24;

/// Generate a fresh session cart token.
#[must_use]
pub fn new_cart_token() -> String {
    let mut bytes = [0u8; CART_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// What to do to get a cart, given what already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartDecision {
    /// Use this existing cart as-is.
    Use(Cart),
    /// Attach this unowned session cart to the user, then use it.
    Claim(Cart, UserId),
    /// Create a new cart with the session token, owned by the user if any.
    Create(Option<UserId>),
}

/// Pick a cart for a request.
///
/// `user_cart` is the logged-in user's oldest cart; `session_cart` is the
/// oldest cart carrying the session token.
#[must_use]
pub fn decide(
    user: Option<UserId>,
    user_cart: Option<Cart>,
    session_cart: Option<Cart>,
) -> CartDecision {
    let Some(user_id) = user else {
        return session_cart.map_or(CartDecision::Create(None), CartDecision::Use);
    };

    if let Some(cart) = user_cart {
        return CartDecision::Use(cart);
    }

    match session_cart {
        Some(cart) if cart.user_id.is_none() => CartDecision::Claim(cart, user_id),
        Some(cart) if cart.user_id == Some(user_id) => CartDecision::Use(cart),
        // Someone else's cart, or none at all.
        _ => CartDecision::Create(Some(user_id)),
    }
}

/// Find or create the cart for a session token and optional user.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any query fails.
pub async fn resolve_cart(
    pool: &PgPool,
    token: &str,
    user: Option<UserId>,
) -> Result<Cart, RepositoryError> {
    let carts = CartRepository::new(pool);

    let user_cart = match user {
        Some(user_id) => carts.find_by_user(user_id).await?,
        None => None,
    };
    let session_cart = if user_cart.is_none() {
        carts.find_by_token(token).await?
    } else {
        None
    };

    match decide(user, user_cart, session_cart) {
        CartDecision::Use(cart) => Ok(cart),
        CartDecision::Claim(cart, user_id) => {
            debug!(cart_id = %cart.id, user_id = %user_id, "Claiming session cart");
            match carts.claim(cart.id, user_id).await? {
                Some(claimed) => Ok(claimed),
                // Lost a race with another request; fall back to a fresh cart.
                None => carts.create(token, Some(user_id)).await,
            }
        }
        CartDecision::Create(owner) => carts.create(token, owner).await,
    }
}

/// The cart's coupon, if it is currently redeemable.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the lookup fails.
pub async fn redeemable_coupon(
    pool: &PgPool,
    cart: &Cart,
    now: DateTime<Utc>,
) -> Result<Option<Coupon>, RepositoryError> {
    let Some(coupon_id) = cart.coupon_id else {
        return Ok(None);
    };
    let coupon = CouponRepository::new(pool).get(coupon_id).await?;
    Ok(coupon.filter(|c| c.terms().is_redeemable_at(now)))
}

/// Subtotal, discount and total of a set of cart lines.
#[must_use]
pub fn totals(lines: &[CartLine], coupon: Option<&Coupon>, now: DateTime<Utc>) -> Discounted {
    let subtotal = pricing::subtotal(lines.iter().map(|l| (l.product.price, l.quantity)));
    let terms = coupon.map(Coupon::terms);
    pricing::apply_coupon(subtotal, terms.as_ref(), now)
}

#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub product: Product,
    pub quantity: i32,
    pub active: bool,
    pub sub_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: i32,
}

/// Cart as returned by `GET /cart/api`.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart_id: String,
    pub date_added: DateTime<Utc>,
    pub items: Vec<CartItemView>,
    pub coupon: Option<AppliedCoupon>,
    pub sub_total: Decimal,
    pub discount_amount: Decimal,
    pub grand_total: Decimal,
    pub item_count: i64,
}

impl CartView {
    /// Build the response. `coupon` must already be filtered for redeemability.
    #[must_use]
    pub fn build(cart: &Cart, lines: Vec<CartLine>, coupon: Option<&Coupon>, now: DateTime<Utc>) -> Self {
        let Discounted {
            subtotal,
            discount,
            total,
        } = totals(&lines, coupon, now);
        let item_count = lines.iter().map(|l| i64::from(l.quantity)).sum();

        let items = lines
            .into_iter()
            .map(|line| CartItemView {
                id: line.item_id,
                sub_total: line.sub_total(),
                quantity: line.quantity,
                active: line.item_active,
                product: line.product,
            })
            .collect();

        Self {
            cart_id: cart.cart_token.clone(),
            date_added: cart.date_added,
            items,
            coupon: coupon.map(|c| AppliedCoupon {
                code: c.code.clone(),
                discount: c.discount,
            }),
            sub_total: subtotal,
            discount_amount: discount,
            grand_total: total,
            item_count,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use bazaar_core::{CartId, CouponId, ProductId};

    use super::*;

    const ALICE: UserId = UserId::new(1);
    const BOB: UserId = UserId::new(2);

    fn cart(id: i32, owner: Option<UserId>) -> Cart {
        Cart {
            id: CartId::new(id),
            cart_token: "tok".to_owned(),
            user_id: owner,
            coupon_id: None,
            date_added: Utc::now(),
        }
    }

    #[test]
    fn test_anonymous_uses_session_cart() {
        let session = cart(5, None);
        assert_eq!(
            decide(None, None, Some(session.clone())),
            CartDecision::Use(session)
        );
    }

    #[test]
    fn test_anonymous_without_cart_creates_unowned() {
        assert_eq!(decide(None, None, None), CartDecision::Create(None));
    }

    #[test]
    fn test_user_cart_wins_over_session_cart() {
        let mine = cart(1, Some(ALICE));
        let session = cart(5, None);
        assert_eq!(
            decide(Some(ALICE), Some(mine.clone()), Some(session)),
            CartDecision::Use(mine)
        );
    }

    #[test]
    fn test_unowned_session_cart_is_claimed() {
        let session = cart(5, None);
        assert_eq!(
            decide(Some(ALICE), None, Some(session.clone())),
            CartDecision::Claim(session, ALICE)
        );
    }

    #[test]
    fn test_own_session_cart_is_used() {
        let session = cart(5, Some(ALICE));
        assert_eq!(
            decide(Some(ALICE), None, Some(session.clone())),
            CartDecision::Use(session)
        );
    }

    #[test]
    fn test_foreign_session_cart_is_not_taken() {
        let session = cart(5, Some(BOB));
        assert_eq!(
            decide(Some(ALICE), None, Some(session)),
            CartDecision::Create(Some(ALICE))
        );
    }

    #[test]
    fn test_user_without_any_cart_gets_new_owned_cart() {
        assert_eq!(decide(Some(ALICE), None, None), CartDecision::Create(Some(ALICE)));
    }

    #[test]
    fn test_cart_tokens_are_random_and_url_safe() {
        let a = new_cart_token();
        let b = new_cart_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    fn line(price: Decimal, quantity: i32) -> CartLine {
        let now = Utc::now();
        CartLine {
            item_id: CartItemId::new(quantity),
            quantity,
            item_active: true,
            product: Product {
                id: ProductId::new(quantity),
                category_id: None,
                name: "Thing".to_owned(),
                slug: format!("thing-{quantity}"),
                description: String::new(),
                price,
                image: None,
                stock: 10,
                available: true,
                created_at: now,
                updated_at: now,
            },
        }
    }

    fn coupon(discount: i32, active: bool, now: DateTime<Utc>) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: "SAVE".to_owned(),
            discount,
            active,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(1),
        }
    }

    #[test]
    fn test_view_applies_coupon() {
        let now = Utc::now();
        let lines = vec![line(Decimal::new(2500, 2), 2), line(Decimal::new(5000, 2), 1)];
        let coupon = coupon(10, true, now);
        let view = CartView::build(&cart(1, None), lines, Some(&coupon), now);

        assert_eq!(view.sub_total, Decimal::new(100, 0));
        assert_eq!(view.discount_amount, Decimal::new(10, 0));
        assert_eq!(view.grand_total, Decimal::new(90, 0));
        assert_eq!(view.item_count, 3);
        assert_eq!(view.items[0].sub_total, Decimal::new(5000, 2));
        assert_eq!(view.coupon.unwrap().code, "SAVE");
    }

    #[test]
    fn test_view_without_coupon() {
        let now = Utc::now();
        let view = CartView::build(&cart(1, None), vec![line(Decimal::new(1999, 2), 1)], None, now);
        assert_eq!(view.grand_total, Decimal::new(1999, 2));
        assert_eq!(view.discount_amount, Decimal::ZERO);
        assert!(view.coupon.is_none());
        assert_eq!(view.cart_id, "tok");
    }

    #[test]
    fn test_inactive_coupon_does_not_discount_totals() {
        let now = Utc::now();
        let lines = vec![line(Decimal::new(100, 0), 1)];
        let coupon = coupon(10, false, now);
        assert_eq!(totals(&lines, Some(&coupon), now).total, Decimal::new(100, 0));
    }
}
