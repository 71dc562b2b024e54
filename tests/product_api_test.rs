mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::json;

use common::{decimal_of, expect_json, TestApp};

#[tokio::test]
async fn registering_a_known_barcode_adds_a_batch() {
    let app = TestApp::new().await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "Sabonete",
                "barcode": "7901",
                "price": "3.20",
                "quantity": 4,
            })),
        )
        .await;
    let body = expect_json(response, StatusCode::CREATED).await;
    let product_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["total_stock"], 4);

    // Scanning the same barcode again restocks instead of duplicating, and
    // carries the new shelf price.
    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "Sabonete",
                "barcode": "7901",
                "price": "4.50",
                "quantity": 6,
            })),
        )
        .await;
    let body = expect_json(response, StatusCode::CREATED).await;
    assert_eq!(body["id"].as_str().unwrap(), product_id);
    assert_eq!(body["total_stock"], 10);
    assert_eq!(decimal_of(&body["price"]), dec!(4.50));

    let response = app
        .admin_request(Method::GET, "/api/v1/products/barcode/7901", None)
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(decimal_of(&body["price"]), dec!(4.50));

    let response = app
        .admin_request(Method::GET, "/api/v1/products", None)
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let entries = app
        .state
        .services
        .stocks
        .list_entries()
        .await
        .expect("list entries");
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.batch_code.starts_with("LOTE-")));
}

#[tokio::test]
async fn barcode_lookup_finds_the_product() {
    let app = TestApp::new().await;
    app.seed_product("Detergente", "7902", dec!(2.80), 7, Utc::now() + Duration::days(365))
        .await;

    let response = app
        .admin_request(Method::GET, "/api/v1/products/barcode/7902", None)
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["name"], "Detergente");
    assert_eq!(body["total_stock"], 7);

    let response = app
        .admin_request(Method::GET, "/api/v1/products/barcode/0000", None)
        .await;
    expect_json(response, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
async fn updating_a_product_keeps_past_sale_prices() {
    let app = TestApp::new().await;
    let product = app
        .seed_product("Manteiga", "7903", dec!(12.00), 10, Utc::now() + Duration::days(40))
        .await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "items": [{"product_id": product.product.id, "quantity": 1}],
                "payment_type": "CASH",
            })),
        )
        .await;
    let sale = expect_json(response, StatusCode::CREATED).await;

    let response = app
        .admin_request(
            Method::PUT,
            &format!("/api/v1/products/{}", product.product.id),
            Some(json!({"price": "15.00"})),
        )
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(decimal_of(&body["price"]), dec!(15.00));

    // The recorded sale still carries the price at sale time.
    let sale_id = sale["id"].as_str().unwrap();
    let response = app
        .admin_request(Method::GET, &format!("/api/v1/sales/{sale_id}"), None)
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(decimal_of(&body["items"][0]["unit_price"]), dec!(12.00));
}

#[tokio::test]
async fn deleting_a_product_cascades_to_batches_and_sale_items() {
    let app = TestApp::new().await;
    let product = app
        .seed_product("Iogurte", "7904", dec!(4.50), 8, Utc::now() + Duration::days(15))
        .await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "items": [{"product_id": product.product.id, "quantity": 2}],
                "payment_type": "CASH",
            })),
        )
        .await;
    let sale = expect_json(response, StatusCode::CREATED).await;
    let sale_id = sale["id"].as_str().unwrap().to_string();

    let response = app
        .admin_request(
            Method::DELETE,
            &format!("/api/v1/products/{}", product.product.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .admin_request(
            Method::GET,
            &format!("/api/v1/products/{}", product.product.id),
            None,
        )
        .await;
    expect_json(response, StatusCode::NOT_FOUND).await;

    let entries = app
        .state
        .services
        .stocks
        .list_entries()
        .await
        .expect("list entries");
    assert!(entries.is_empty());

    // The sale row survives; its items for the removed product do not.
    let response = app
        .admin_request(Method::GET, &format!("/api/v1/sales/{sale_id}"), None)
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn stock_corrections_and_removal() {
    let app = TestApp::new().await;
    let product = app
        .seed_product("Farinha", "7905", dec!(7.00), 0, Utc::now() + Duration::days(200))
        .await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/stocks",
            Some(json!({
                "product_id": product.product.id,
                "quantity": 12,
                "expiry_date": (Utc::now() + Duration::days(90)).to_rfc3339(),
                "code": "LOTE-F01",
            })),
        )
        .await;
    let body = expect_json(response, StatusCode::CREATED).await;
    assert_eq!(body["batch_code"], "LOTE-F01");
    let stock_id = body["stock_id"].as_str().unwrap().to_string();

    let response = app
        .admin_request(
            Method::PUT,
            &format!("/api/v1/stocks/{stock_id}"),
            Some(json!({"quantity": 9})),
        )
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["quantity"], 9);

    let response = app
        .admin_request(Method::DELETE, &format!("/api/v1/stocks/{stock_id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let product = app
        .state
        .services
        .products
        .get_product(product.product.id)
        .await
        .expect("product exists");
    assert_eq!(product.total_stock, 0);
}

#[tokio::test]
async fn dashboard_reflects_sales_and_low_stock() {
    let app = TestApp::new().await;
    // min_stock defaults to 5, so 3 remaining units flag the product.
    let product = app
        .seed_product("Ovos", "7906", dec!(15.00), 5, Utc::now() + Duration::days(12))
        .await;
    let resident = app.seed_resident("Seu Jorge", "40450560670").await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "items": [{"product_id": product.product.id, "quantity": 2}],
                "payment_type": "DEFERRED",
                "resident_id": resident.resident.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.admin_request(Method::GET, "/api/v1/dashboard", None).await;
    let body = expect_json(response, StatusCode::OK).await;

    assert_eq!(decimal_of(&body["revenue_today"]), dec!(30.00));
    assert_eq!(decimal_of(&body["revenue_month"]), dec!(30.00));
    assert_eq!(body["sales_today"], 1);
    assert_eq!(decimal_of(&body["total_receivable"]), dec!(30.00));

    let low_stock = body["low_stock"].as_array().unwrap();
    assert_eq!(low_stock.len(), 1);
    assert_eq!(low_stock[0]["total_stock"], 3);
}

#[tokio::test]
async fn protected_routes_require_auth_and_admin_role() {
    let app = TestApp::new().await;

    // No token at all.
    let response = app
        .request(Method::GET, "/api/v1/products", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A resident token passes authentication but not the admin gate.
    let resident = app.seed_resident("Visitante", "50560670780").await;
    let token = app.token_for(&resident.resident);
    let response = app
        .request(Method::GET, "/api/v1/dashboard", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Residents can still read the catalog.
    let response = app
        .request(Method::GET, "/api/v1/products", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Garbage tokens are rejected.
    let response = app
        .request(Method::GET, "/api/v1/products", None, Some("not-a-token"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "up");
}
