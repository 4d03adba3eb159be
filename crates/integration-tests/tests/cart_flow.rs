//! Integration tests for the guest cart and checkout entry points.
//!
//! These tests require:
//! - A migrated database seeded with at least one product in stock
//! - The storefront running (cargo run -p bazaar-storefront)

use bazaar_integration_tests::{
    base_url, in_stock_product, json_body, login_new_customer, session_client,
};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_guest_cart_add_and_remove() {
    let client = session_client();
    let base = base_url();
    let product_id = in_stock_product(&client).await["id"].as_i64().unwrap();

    let resp = client
        .post(format!("{base}/cart/api/add/{product_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["quantity"], 1);

    let resp = client
        .post(format!("{base}/cart/api/add/{product_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(json_body(resp).await["quantity"], 2);

    let cart = json_body(client.get(format!("{base}/cart/api")).send().await.unwrap()).await;
    assert_eq!(cart["item_count"], 2);

    let resp = client
        .delete(format!("{base}/cart/api/full_remove/{product_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base}/cart/api/remove/{product_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Item not in cart");
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_unknown_product_is_not_found() {
    let resp = session_client()
        .post(format!("{}/cart/api/add/999999999", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_coupon_validation() {
    let client = session_client();
    let base = base_url();

    let resp = client
        .post(format!("{base}/cart/api/apply-coupon"))
        .json(&json!({ "code": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Coupon code is required");

    let resp = client
        .post(format!("{base}/cart/api/apply-coupon"))
        .json(&json!({ "code": "NOT-A-REAL-CODE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Invalid or expired coupon");
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_empty_cart_cannot_check_out() {
    let client = session_client();
    let resp = client
        .post(format!("{}/cart/api/create-order", base_url()))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Cart is empty");
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_forged_signature_is_rejected() {
    let client = session_client();
    let resp = client
        .post(format!("{}/cart/api/verify-payment", base_url()))
        .json(&json!({
            "razorpay_order_id": "order_does_not_exist",
            "razorpay_payment_id": "pay_forged",
            "razorpay_signature": "00",
        }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_guest_cart_follows_login() {
    let client = session_client();
    let base = base_url();
    let product_id = in_stock_product(&client).await["id"].as_i64().unwrap();

    client
        .post(format!("{base}/cart/api/add/{product_id}"))
        .send()
        .await
        .unwrap();
    login_new_customer(&client).await;

    let cart = json_body(client.get(format!("{base}/cart/api")).send().await.unwrap()).await;
    assert_eq!(cart["item_count"], 1);
}
