//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Liveness
//! GET  /health/ready                            - Readiness (database ping)
//! GET  /media/{path}                            - Uploaded product images
//!
//! # Catalog
//! GET  /shop/api/categories                     - All categories
//! GET  /shop/api/products                       - Filtered listing
//! GET  /shop/api/products/search-suggestions    - Search-as-you-type
//! GET  /shop/api/products/{slug}                - Product detail
//!
//! # Wishlist, addresses, reviews (login unless noted)
//! GET  /shop/api/wishlist                       - Wishlist with products
//! POST /shop/api/wishlist/add/{product_id}
//! DEL  /shop/api/wishlist/remove/{product_id}
//! GET  /shop/api/wishlist/check/{product_id}
//! GET  /shop/api/wishlist/product-ids
//! GET  /shop/api/addresses                      - Saved addresses (POST creates)
//! *    /shop/api/addresses/{id}                 - GET / PUT / DELETE
//! POST /shop/api/addresses/{id}/set-default
//! POST /shop/api/reviews/submit/{product_id}
//! GET  /shop/api/reviews/{product_id}           - Public
//! GET  /shop/api/admin/reviews                  - Staff moderation list
//! *    /shop/api/admin/reviews/{id}             - PUT toggles, DELETE removes
//!
//! # Cart & checkout (session cart for guests, user cart after login)
//! GET  /cart/api                                - Cart with totals
//! POST /cart/api/add/{product_id}
//! POST /cart/api/remove/{product_id}
//! DEL  /cart/api/full_remove/{product_id}
//! POST /cart/api/apply-coupon
//! POST /cart/api/remove-coupon
//! POST /cart/api/create-order                   - Open a gateway order
//! POST /cart/api/verify-payment                 - Confirm the payment
//! GET  /cart/api/orders                         - Paid orders
//! GET  /cart/api/orders/{id}
//! GET  /cart/invoice/{id}                       - HTML invoice
//!
//! # Accounts
//! POST /accounts/register                       - Rate limited
//! POST /accounts/login                          - Rate limited
//! POST /accounts/logout
//! *    /accounts/profile                        - GET / PUT
//! *    /api/auth/profile                        - Alias of the above
//!
//! # Staff dashboard
//! GET  /custom-admin/stats
//! GET  /custom-admin/chart-data
//! *    /custom-admin/products                   - GET table / POST create (JSON or multipart)
//! *    /custom-admin/products/{id}              - PATCH stock & price / DELETE
//! GET  /custom-admin/orders
//! PATCH /custom-admin/orders/{id}               - Change status
//! ```

pub mod accounts;
pub mod addresses;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod reviews;
pub mod wishlist;

use axum::Router;

use crate::state::AppState;

/// Shop API: catalog plus the customer collections around it.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog::router())
        .nest("/wishlist", wishlist::router())
        .nest("/addresses", addresses::router())
        .nest("/reviews", reviews::router())
        .nest("/admin/reviews", reviews::admin_router())
}

/// Cart API: cart lines, coupons, checkout and order history.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .merge(cart::router())
        .merge(checkout::router())
        .merge(orders::router())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/shop/api", shop_routes())
        .nest("/cart/api", cart_routes())
        .nest("/cart", orders::invoice_router())
        .nest("/accounts", accounts::router())
        .nest("/api/auth", accounts::profile_alias_router())
        .nest("/custom-admin", admin::router())
}
