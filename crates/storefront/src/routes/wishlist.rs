//! Wishlist API. Every route requires a logged-in customer.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::instrument;

use bazaar_core::{ProductId, WishlistItemId};

use crate::db::{CatalogRepository, RepositoryError, WishlistRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{ProductView, WishlistEntry};
use crate::state::AppState;

/// Build the wishlist router (mounted under `/shop/api/wishlist`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/add/{product_id}", post(add))
        .route("/remove/{product_id}", delete(remove))
        .route("/check/{product_id}", get(check))
        .route("/product-ids", get(product_ids))
}

#[derive(Debug, Serialize)]
pub struct WishlistItemView {
    pub id: WishlistItemId,
    pub product: ProductView,
    pub added_at: DateTime<Utc>,
}

impl From<WishlistEntry> for WishlistItemView {
    fn from(entry: WishlistEntry) -> Self {
        Self {
            id: entry.item_id,
            product: entry.listing.into(),
            added_at: entry.added_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WishlistView {
    pub items: Vec<WishlistItemView>,
    pub count: usize,
}

/// The customer's wishlist, created on first visit.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<WishlistView>> {
    let wishlists = WishlistRepository::new(state.pool());
    wishlists.get_or_create(user.id).await?;
    let items: Vec<WishlistItemView> = wishlists
        .entries(user.id)
        .await?
        .into_iter()
        .map(WishlistItemView::from)
        .collect();

    Ok(Json(WishlistView {
        count: items.len(),
        items,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<(StatusCode, Json<Value>)> {
    CatalogRepository::new(state.pool())
        .get_product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;

    let added = WishlistRepository::new(state.pool())
        .add(user.id, product_id)
        .await?;

    Ok(if added {
        (
            StatusCode::CREATED,
            Json(json!({ "message": "Added to wishlist" })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({ "message": "Product already in wishlist" })),
        )
    })
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Value>> {
    WishlistRepository::new(state.pool())
        .remove(user.id, product_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Item not in wishlist".to_owned()),
            other => other.into(),
        })?;
    Ok(Json(json!({ "message": "Removed from wishlist" })))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn check(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Value>> {
    let in_wishlist = WishlistRepository::new(state.pool())
        .contains(user.id, product_id)
        .await?;
    Ok(Json(json!({ "in_wishlist": in_wishlist })))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn product_ids(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>> {
    let ids = WishlistRepository::new(state.pool())
        .product_ids(user.id)
        .await?;
    Ok(Json(json!({ "product_ids": ids })))
}
