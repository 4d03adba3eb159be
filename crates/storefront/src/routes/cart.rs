//! Cart API handlers.
//!
//! Every handler starts by resolving the visitor's cart from the session's
//! cart token and the logged-in user, if any.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::ProductId;

use crate::db::{CartRepository, CatalogRepository, CouponRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, cart_token};
use crate::models::{Cart, CurrentUser};
use crate::services::cart::{CartView, redeemable_coupon, resolve_cart};
use crate::state::AppState;

/// Build the cart router (mounted under `/cart/api`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show))
        .route("/add/{product_id}", post(add))
        .route("/remove/{product_id}", post(remove))
        .route("/full_remove/{product_id}", delete(full_remove))
        .route("/apply-coupon", post(apply_coupon))
        .route("/remove-coupon", post(remove_coupon))
}

/// The cart this request talks about, created on first use.
///
/// # Errors
///
/// Returns an error if the session or database can't be reached.
pub async fn current_cart(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<Cart> {
    let token = cart_token(session).await?;
    let cart = resolve_cart(state.pool(), &token, user.map(|u| u.id)).await?;
    Ok(cart)
}

fn not_in_cart(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::BadRequest("Item not in cart".to_owned()),
        other => other.into(),
    }
}

/// Show the cart with totals.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartView>> {
    let cart = current_cart(&state, &session, user.as_ref()).await?;
    let lines = CartRepository::new(state.pool()).active_lines(cart.id).await?;
    let now = Utc::now();
    let coupon = redeemable_coupon(state.pool(), &cart, now).await?;
    Ok(Json(CartView::build(&cart, lines, coupon.as_ref(), now)))
}

/// Add one unit of a product.
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Value>> {
    let product = CatalogRepository::new(state.pool())
        .get_product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;

    let cart = current_cart(&state, &session, user.as_ref()).await?;
    let carts = CartRepository::new(state.pool());

    if carts.quantity_of(cart.id, product_id).await?.is_none() && !product.in_stock() {
        return Err(AppError::BadRequest("Product is out of stock".to_owned()));
    }

    let quantity = carts.increment(cart.id, product_id, product.stock).await?;
    let product_ref = product_id.to_string();
    add_breadcrumb("cart", "Added product", Some(&[("product_id", product_ref.as_str())]));

    Ok(Json(json!({ "status": "Item added to cart", "quantity": quantity })))
}

/// Remove one unit of a product.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Value>> {
    let cart = current_cart(&state, &session, user.as_ref()).await?;
    CartRepository::new(state.pool())
        .decrement(cart.id, product_id)
        .await
        .map_err(not_in_cart)?;
    Ok(Json(json!({ "status": "Item removed from cart" })))
}

/// Remove a product's line entirely.
#[instrument(skip(state, session, user))]
pub async fn full_remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Value>> {
    let cart = current_cart(&state, &session, user.as_ref()).await?;
    CartRepository::new(state.pool())
        .remove_line(cart.id, product_id)
        .await
        .map_err(not_in_cart)?;
    Ok(Json(json!({ "status": "Item completely removed" })))
}

/// Coupon code submitted by the shopper.
#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    #[serde(default)]
    pub code: String,
}

/// Attach a redeemable coupon to the cart.
#[instrument(skip(state, session, user))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<ApplyCouponRequest>,
) -> Result<Json<Value>> {
    let code = body.code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("Coupon code is required".to_owned()));
    }

    let now = Utc::now();
    let coupon = CouponRepository::new(state.pool())
        .get_by_code(code)
        .await?
        .filter(|c| c.terms().is_redeemable_at(now))
        .ok_or_else(|| AppError::BadRequest("Invalid or expired coupon".to_owned()))?;

    let cart = current_cart(&state, &session, user.as_ref()).await?;
    CartRepository::new(state.pool())
        .set_coupon(cart.id, Some(coupon.id))
        .await?;

    Ok(Json(json!({
        "message": "Coupon applied successfully",
        "discount": coupon.discount,
        "code": coupon.code,
        "status": "success",
    })))
}

/// Detach any coupon from the cart.
#[instrument(skip_all)]
pub async fn remove_coupon(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let cart = current_cart(&state, &session, user.as_ref()).await?;
    CartRepository::new(state.pool())
        .set_coupon(cart.id, None)
        .await?;
    Ok(Json(json!({ "message": "Coupon removed successfully", "status": "success" })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn test_missing_line_is_bad_request() {
        let response = not_in_cart(RepositoryError::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response =
            not_in_cart(RepositoryError::DataCorruption("x".to_owned())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
