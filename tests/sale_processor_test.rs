mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::{decimal_of, expect_json, TestApp};

async fn total_stock(app: &TestApp, product_id: Uuid) -> i64 {
    app.state
        .services
        .products
        .get_product(product_id)
        .await
        .expect("product exists")
        .total_stock
}

#[tokio::test]
async fn cash_sale_consumes_batches_in_expiry_order() {
    let app = TestApp::new().await;

    let soon = Utc::now() + Duration::days(5);
    let later = Utc::now() + Duration::days(90);
    let product = app.seed_product("Leite", "7891", dec!(6.50), 3, soon).await;
    // Same barcode: a second, later-expiring batch for the same product.
    app.seed_product("Leite", "7891", dec!(6.50), 5, later).await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "items": [{"product_id": product.product.id, "quantity": 5}],
                "payment_type": "CASH",
            })),
        )
        .await;
    let body = expect_json(response, StatusCode::CREATED).await;

    assert_eq!(decimal_of(&body["total"]), dec!(32.50));
    assert_eq!(body["status"], "COMPLETED");
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    // Each line carries its product so the receipt can render names.
    assert_eq!(items[0]["product"]["name"], "Leite");
    assert_eq!(items[0]["product"]["barcode"], "7891");

    // 3 from the soon-expiring batch, 2 from the later one.
    let entries = app
        .state
        .services
        .stocks
        .list_entries()
        .await
        .expect("list stock entries");
    let quantities: Vec<i32> = entries
        .iter()
        .filter(|e| e.product_id == product.product.id)
        .map(|e| e.quantity)
        .collect();
    assert_eq!(quantities, vec![0, 3]);
}

#[tokio::test]
async fn insufficient_stock_reports_availability_and_changes_nothing() {
    let app = TestApp::new().await;
    let product = app
        .seed_product("Arroz", "7892", dec!(22.00), 2, Utc::now() + Duration::days(30))
        .await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "items": [{"product_id": product.product.id, "quantity": 5}],
                "payment_type": "CASH",
            })),
        )
        .await;
    let body = expect_json(response, StatusCode::BAD_REQUEST).await;

    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Available: 2"), "got: {message}");
    assert_eq!(total_stock(&app, product.product.id).await, 2);

    let sales = app
        .state
        .services
        .sales
        .list_sales(None)
        .await
        .expect("list sales");
    assert!(sales.is_empty());
}

#[tokio::test]
async fn deferred_sale_charges_the_residents_tab() {
    let app = TestApp::new().await;
    let product = app
        .seed_product("Cafe", "7893", dec!(10.00), 10, Utc::now() + Duration::days(60))
        .await;
    let resident = app.seed_resident("Maria Souza", "11122233344").await;

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
    let body = expect_json(response, StatusCode::CREATED).await;
    assert_eq!(decimal_of(&body["total"]), dec!(20.00));
    assert_eq!(
        body["resident_id"].as_str().unwrap(),
        resident.resident.id.to_string()
    );

    let account = app
        .state
        .services
        .accounts
        .get_by_resident(resident.resident.id)
        .await
        .expect("account exists");
    assert_eq!(account.balance, dec!(20.00));
}

#[tokio::test]
async fn deferred_sale_over_the_limit_rolls_back() {
    let app = TestApp::new().await;
    let product = app
        .seed_product("Azeite", "7894", dec!(60.00), 10, Utc::now() + Duration::days(60))
        .await;
    // Default credit limit is 100; two units cost 120.
    let resident = app.seed_resident("Joao Lima", "22233344455").await;

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
    let body = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert!(body["message"].as_str().unwrap().contains("limit"));

    // Stock decrement happened before the credit check; the rollback must
    // undo it.
    assert_eq!(total_stock(&app, product.product.id).await, 10);
    let account = app
        .state
        .services
        .accounts
        .get_by_resident(resident.resident.id)
        .await
        .expect("account exists");
    assert_eq!(account.balance, dec!(0));
}

#[tokio::test]
async fn blocked_account_conflicts() {
    let app = TestApp::new().await;
    let product = app
        .seed_product("Pao", "7895", dec!(1.00), 10, Utc::now() + Duration::days(3))
        .await;
    let resident = app.seed_resident("Ana Reis", "33344455566").await;
    let account_id = resident.account.as_ref().unwrap().id;

    let response = app
        .admin_request(
            Method::PATCH,
            &format!("/api/v1/accounts/{account_id}"),
            Some(json!({"status": "BLOCKED"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "items": [{"product_id": product.product.id, "quantity": 1}],
                "payment_type": "DEFERRED",
                "resident_id": resident.resident.id,
            })),
        )
        .await;
    expect_json(response, StatusCode::CONFLICT).await;
    assert_eq!(total_stock(&app, product.product.id).await, 10);
}

#[tokio::test]
async fn deferred_sale_requires_a_resident() {
    let app = TestApp::new().await;
    let product = app
        .seed_product("Suco", "7896", dec!(8.00), 4, Utc::now() + Duration::days(20))
        .await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "items": [{"product_id": product.product.id, "quantity": 1}],
                "payment_type": "DEFERRED",
            })),
        )
        .await;
    expect_json(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn unknown_product_rolls_back_earlier_lines() {
    let app = TestApp::new().await;
    let product = app
        .seed_product("Feijao", "7897", dec!(9.00), 6, Utc::now() + Duration::days(45))
        .await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "items": [
                    {"product_id": product.product.id, "quantity": 2},
                    {"product_id": Uuid::new_v4(), "quantity": 1},
                ],
                "payment_type": "CASH",
            })),
        )
        .await;
    expect_json(response, StatusCode::NOT_FOUND).await;

    // The first line's decrement must not survive the abort.
    assert_eq!(total_stock(&app, product.product.id).await, 6);
}

#[tokio::test]
async fn duplicate_cart_lines_are_independent() {
    let app = TestApp::new().await;
    let product = app
        .seed_product("Agua", "7898", dec!(2.50), 5, Utc::now() + Duration::days(10))
        .await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "items": [
                    {"product_id": product.product.id, "quantity": 2},
                    {"product_id": product.product.id, "quantity": 1},
                ],
                "payment_type": "CASH",
            })),
        )
        .await;
    let body = expect_json(response, StatusCode::CREATED).await;

    assert_eq!(decimal_of(&body["total"]), dec!(7.50));
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(total_stock(&app, product.product.id).await, 2);
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({"items": [], "payment_type": "CASH"})),
        )
        .await;
    expect_json(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn sale_history_is_newest_first_and_filterable() {
    let app = TestApp::new().await;
    let product = app
        .seed_product("Chocolate", "7899", dec!(5.00), 20, Utc::now() + Duration::days(120))
        .await;
    let resident = app.seed_resident("Rita Alves", "44455566677").await;

    for quantity in [1, 2] {
        let response = app
            .admin_request(
                Method::POST,
                "/api/v1/sales",
                Some(json!({
                    "items": [{"product_id": product.product.id, "quantity": quantity}],
                    "payment_type": "DEFERRED",
                    "resident_id": resident.resident.id,
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
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
    assert_eq!(response.status(), StatusCode::CREATED);

    let uri = format!("/api/v1/sales?resident_id={}", resident.resident.id);
    let response = app.admin_request(Method::GET, &uri, None).await;
    let body = expect_json(response, StatusCode::OK).await;
    let sales = body.as_array().unwrap();
    assert_eq!(sales.len(), 2);
    assert_eq!(decimal_of(&sales[0]["total"]), dec!(10.00));
    assert_eq!(decimal_of(&sales[1]["total"]), dec!(5.00));
    assert_eq!(sales[0]["items"][0]["product"]["name"], "Chocolate");
}
