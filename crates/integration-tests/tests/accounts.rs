//! Integration tests for accounts and the customer-only collections.
//!
//! These tests require:
//! - A migrated and seeded `PostgreSQL` database
//! - The storefront running (cargo run -p bazaar-storefront)

use bazaar_integration_tests::{
    base_url, in_stock_product, json_body, login_new_customer, session_client,
};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_login_profile_logout() {
    let client = session_client();
    let base = base_url();
    let username = login_new_customer(&client).await;

    let profile = json_body(
        client
            .get(format!("{base}/accounts/profile"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(profile["username"], username.as_str());

    let resp = client
        .put(format!("{base}/api/auth/profile"))
        .json(&json!({ "first_name": "Asha" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["first_name"], "Asha");

    let resp = client
        .post(format!("{base}/accounts/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base}/accounts/profile"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_wrong_password_is_unauthorized() {
    let resp = session_client()
        .post(format!("{}/accounts/login", base_url()))
        .json(&json!({ "username": "nobody_here", "password": "wrong password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_wishlist_requires_login() {
    let resp = session_client()
        .get(format!("{}/shop/api/wishlist", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_wishlist_add_is_idempotent() {
    let client = session_client();
    let base = base_url();
    login_new_customer(&client).await;
    let product_id = in_stock_product(&client).await["id"].as_i64().unwrap();

    let first = client
        .post(format!("{base}/shop/api/wishlist/add/{product_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = client
        .post(format!("{base}/shop/api/wishlist/add/{product_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);

    let check = json_body(
        client
            .get(format!("{base}/shop/api/wishlist/check/{product_id}"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(check["in_wishlist"], true);

    let wishlist = json_body(
        client
            .get(format!("{base}/shop/api/wishlist"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(wishlist["count"], 1);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_first_address_becomes_default() {
    let client = session_client();
    let base = base_url();
    login_new_customer(&client).await;

    let resp = client
        .post(format!("{base}/shop/api/addresses"))
        .json(&json!({
            "name": "Asha Rao",
            "phone": "9876543210",
            "address_line1": "12 MG Road",
            "city": "Bengaluru",
            "state": "Karnataka",
            "postal_code": "560001",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let addresses = json_body(
        client
            .get(format!("{base}/shop/api/addresses"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(addresses.as_array().map(Vec::len), Some(1));
    assert_eq!(addresses[0]["is_default"], true);

    let resp = client
        .post(format!("{base}/shop/api/addresses"))
        .json(&json!({ "name": "Missing Fields" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "phone is required");
}
