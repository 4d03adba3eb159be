//! Integration tests for the Bazaar storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! cargo run -p bazaar-cli -- seed fixtures/demo.yaml
//! cargo run -p bazaar-storefront &
//! cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! The tests talk to a running server over HTTP. `STOREFRONT_URL` points them
//! at it (default `http://localhost:8000`). Dashboard tests also need a staff
//! account named by `STAFF_USERNAME` / `STAFF_PASSWORD`.
//!
//! The server must trust `X-Forwarded-For`, which it does when reached
//! directly.
//!
//! Checkout tests open real gateway orders, so run the server with Razorpay
//! test-mode keys and export the same `RAZORPAY_KEY_SECRET` to the tests;
//! they sign the payment the way the checkout widget would.

use bazaar_storefront::services::payment::payment_signature;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the storefront under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_URL").unwrap_or_else(|_| "http://localhost:8000".to_owned())
}

/// A client that keeps the session cookie between requests.
///
/// Each client claims its own `X-Forwarded-For` address so the per-IP login
/// limit does not trip across tests.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn session_client() -> Client {
    let [a, b, c, ..] = *Uuid::new_v4().as_bytes();
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_str(&format!("10.{a}.{b}.{c}")).expect("valid header"),
    );

    Client::builder()
        .cookie_store(true)
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// A username no other test run will collide with.
#[must_use]
pub fn unique_username(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &suffix[..12])
}

/// Register a fresh customer and log the client in as them.
///
/// # Panics
///
/// Panics if registration or login does not succeed.
#[allow(clippy::expect_used)]
pub async fn login_new_customer(client: &Client) -> String {
    let base = base_url();
    let username = unique_username("customer");
    let password = "correct horse battery staple";

    let resp = client
        .post(format!("{base}/accounts/register"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": password,
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);

    login(client, &username, password).await;
    username
}

/// Log in with existing credentials.
///
/// # Panics
///
/// Panics if the login request fails or is rejected.
#[allow(clippy::expect_used)]
pub async fn login(client: &Client, username: &str, password: &str) {
    let resp = client
        .post(format!("{}/accounts/login", base_url()))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::OK);
}

/// Read a JSON body.
///
/// # Panics
///
/// Panics if the body is not JSON.
#[allow(clippy::expect_used)]
pub async fn json_body(resp: Response) -> Value {
    resp.json().await.expect("Response was not JSON")
}

/// Slug of some product that is in stock, taken from the listing.
///
/// # Panics
///
/// Panics if the catalog has no product in stock.
#[allow(clippy::expect_used)]
pub async fn in_stock_product(client: &Client) -> Value {
    let resp = client
        .get(format!("{}/shop/api/products?in_stock=true", base_url()))
        .send()
        .await
        .expect("Failed to list products");
    let products = json_body(resp).await;
    products
        .as_array()
        .and_then(|p| p.first())
        .cloned()
        .expect("Seed the catalog with at least one product in stock")
}

/// Sign a payment the way the gateway's checkout widget does.
///
/// # Panics
///
/// Panics if `RAZORPAY_KEY_SECRET` is not set.
#[must_use]
#[allow(clippy::expect_used)]
pub fn sign_payment(gateway_order_id: &str, gateway_payment_id: &str) -> String {
    let secret = std::env::var("RAZORPAY_KEY_SECRET").expect("RAZORPAY_KEY_SECRET not set");
    payment_signature(&secret, gateway_order_id, gateway_payment_id)
}

/// Log in as the staff account named by `STAFF_USERNAME` / `STAFF_PASSWORD`.
///
/// # Panics
///
/// Panics if either variable is unset or the login is rejected.
#[allow(clippy::expect_used)]
pub async fn staff_client() -> Client {
    let client = session_client();
    let username = std::env::var("STAFF_USERNAME").expect("STAFF_USERNAME not set");
    let password = std::env::var("STAFF_PASSWORD").expect("STAFF_PASSWORD not set");
    login(&client, &username, &password).await;
    client
}
