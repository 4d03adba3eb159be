//! Integration tests for the staff dashboard API.
//!
//! These tests require:
//! - The storefront running (cargo run -p bazaar-storefront)
//! - A staff account (cargo run -p bazaar-cli -- admin create ...) named by
//!   `STAFF_USERNAME` and `STAFF_PASSWORD`

use bazaar_integration_tests::{
    base_url, json_body, login_new_customer, session_client, staff_client, unique_username,
};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_dashboard_is_staff_only() {
    let base = base_url();

    let resp = session_client()
        .get(format!("{base}/custom-admin/stats"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let customer = session_client();
    login_new_customer(&customer).await;
    let resp = customer
        .get(format!("{base}/custom-admin/stats"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running storefront, database and a staff account"]
async fn test_stats_and_chart_data() {
    let client = staff_client().await;
    let base = base_url();

    let stats = json_body(
        client
            .get(format!("{base}/custom-admin/stats"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert!(stats["total_orders"].is_i64());
    assert!(stats["recent_orders"].as_array().unwrap().len() <= 5);

    let chart = json_body(
        client
            .get(format!("{base}/custom-admin/chart-data"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(
        chart["labels"].as_array().unwrap().len(),
        chart["revenue"].as_array().unwrap().len()
    );
}

#[tokio::test]
#[ignore = "Requires running storefront, database and a staff account"]
async fn test_product_create_validation() {
    let client = staff_client().await;
    let base = base_url();

    let resp = client
        .post(format!("{base}/custom-admin/products"))
        .json(&json!({ "name": "No Price", "slug": "no-price" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await["error"],
        "Name, Slug and Price are required"
    );

    let resp = client
        .get(format!("{base}/custom-admin/products?page=9999"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let table = json_body(resp).await;
    assert_eq!(table["current_page"], table["total_pages"]);
}

#[tokio::test]
#[ignore = "Requires running storefront, database and a staff account"]
async fn test_order_status_validation() {
    let client = staff_client().await;
    let base = base_url();

    let resp = client
        .patch(format!("{base}/custom-admin/orders/1"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Status required");

    let resp = client
        .patch(format!("{base}/custom-admin/orders/1"))
        .json(&json!({ "status": "lost-in-transit" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Invalid status");

    let resp = client
        .get(format!("{base}/custom-admin/orders?status=bogus"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .get(format!("{base}/custom-admin/orders?status=all"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront, database and a staff account"]
async fn test_product_create_with_image_upload() {
    let client = staff_client().await;
    let base = base_url();
    let slug = unique_username("lamp").replace('_', "-");
    let png = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    let form = Form::new()
        .text("name", "Upload Lamp")
        .text("slug", slug.clone())
        .text("price", "349.00")
        .text("stock", "3")
        .part(
            "image",
            Part::bytes(png.clone())
                .file_name("lamp.png")
                .mime_str("image/png")
                .unwrap(),
        );
    let resp = client
        .post(format!("{base}/custom-admin/products"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product = json_body(resp).await;
    assert_eq!(product["slug"], slug.as_str());
    let image = product["image"].as_str().unwrap().to_owned();
    assert!(image.starts_with("/media/products/"));

    let resp = client.get(format!("{base}{image}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.bytes().await.unwrap().to_vec(), png);

    let form = Form::new()
        .text("name", "Script")
        .text("slug", format!("{slug}-x"))
        .text("price", "1")
        .part("image", Part::bytes(b"#!/bin/sh".to_vec()).file_name("run.sh"));
    let resp = client
        .post(format!("{base}/custom-admin/products"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Unsupported image type");
}
