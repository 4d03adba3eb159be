//! Integration tests for a paid checkout, end to end.
//!
//! These tests require:
//! - A migrated database seeded with at least one product in stock
//! - The storefront running with Razorpay test-mode keys
//! - `RAZORPAY_KEY_SECRET` exported to the tests as well
//! - Optionally `COUPON_CODE`, a redeemable coupon applied before paying
//! - For the shipping test, a staff account named by `STAFF_USERNAME` and
//!   `STAFF_PASSWORD`

use bazaar_integration_tests::{
    base_url, in_stock_product, json_body, login_new_customer, session_client, sign_payment,
    staff_client, unique_username,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

/// A checkout that went through: the local order id and the gateway ids.
struct PaidOrder {
    id: i64,
    gateway_order_id: String,
    payment_id: String,
    product: Value,
}

async fn verify(client: &Client, gateway_order_id: &str, payment_id: &str) -> reqwest::Response {
    client
        .post(format!("{}/cart/api/verify-payment", base_url()))
        .json(&json!({
            "razorpay_order_id": gateway_order_id,
            "razorpay_payment_id": payment_id,
            "razorpay_signature": sign_payment(gateway_order_id, payment_id),
        }))
        .send()
        .await
        .unwrap()
}

/// Fill the cart with one product, open a gateway order and pay for it.
async fn pay_for_one_item(client: &Client) -> PaidOrder {
    let base = base_url();
    let product = in_stock_product(client).await;
    let product_id = product["id"].as_i64().unwrap();

    let resp = client
        .post(format!("{base}/cart/api/add/{product_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    if let Ok(code) = std::env::var("COUPON_CODE") {
        let resp = client
            .post(format!("{base}/cart/api/apply-coupon"))
            .json(&json!({ "code": code }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = client
        .post(format!("{base}/cart/api/create-order"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = json_body(resp).await;
    let gateway_order_id = created["order_id"].as_str().unwrap().to_owned();
    assert!(created["amount"].as_i64().unwrap() > 0);

    let payment_id = unique_username("pay");
    let resp = verify(client, &gateway_order_id, &payment_id).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let verified = json_body(resp).await;
    assert_eq!(verified["status"], "Payment verified successfully");
    assert_eq!(verified["order_id"], gateway_order_id.as_str());
    assert_eq!(verified["payment_id"], payment_id.as_str());

    let orders = json_body(
        client
            .get(format!("{base}/cart/api/orders"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let order = orders
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["order_id"] == gateway_order_id.as_str())
        .cloned()
        .unwrap();

    PaidOrder {
        id: order["id"].as_i64().unwrap(),
        gateway_order_id,
        payment_id,
        product,
    }
}

#[tokio::test]
#[ignore = "Requires running storefront, database and gateway test keys"]
async fn test_verified_payment_settles_the_order() {
    let client = session_client();
    let base = base_url();
    login_new_customer(&client).await;

    let paid = pay_for_one_item(&client).await;

    let detail = json_body(
        client
            .get(format!("{base}/cart/api/orders/{}", paid.id))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(detail["status"], "paid");
    assert_eq!(detail["payment"]["payment_id"], paid.payment_id.as_str());
    assert_eq!(detail["item_count"], 1);

    let items = detail["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_name"], paid.product["name"]);
    assert_eq!(items[0]["quantity"], 1);

    let cart = json_body(client.get(format!("{base}/cart/api")).send().await.unwrap()).await;
    assert_eq!(cart["item_count"], 0);
    assert!(cart["items"].as_array().unwrap().is_empty());
    assert!(cart["coupon"].is_null());

    let resp = verify(&client, &paid.gateway_order_id, &unique_username("pay")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["error"], "Order is already paid");
}

#[tokio::test]
#[ignore = "Requires running storefront, database, gateway test keys and a staff account"]
async fn test_shipped_order_leaves_customer_history() {
    let client = session_client();
    let base = base_url();
    login_new_customer(&client).await;

    let paid = pay_for_one_item(&client).await;

    let resp = staff_client()
        .await
        .patch(format!("{base}/custom-admin/orders/{}", paid.id))
        .json(&json!({ "status": "shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let orders = json_body(
        client
            .get(format!("{base}/cart/api/orders"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert!(
        orders
            .as_array()
            .unwrap()
            .iter()
            .all(|o| o["order_id"] != paid.gateway_order_id.as_str())
    );

    let resp = client
        .get(format!("{base}/cart/api/orders/{}", paid.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = verify(&client, &paid.gateway_order_id, &unique_username("pay")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["error"], "Order is not pending");
}
