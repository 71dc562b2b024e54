use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use condostock_api::config::AppConfig;
use condostock_api::services::products::{CreateProductInput, ProductService};
use condostock_api::services::sales::{CreateSaleInput, SaleLineInput, SaleService};
use condostock_api::{db, models::PaymentType};

// Ignored by default: hammers a real SQLite file with a multi-connection
// pool. Run with: cargo test -- --ignored sale_concurrency
#[tokio::test]
#[ignore]
async fn sale_concurrency_never_oversells() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let db_path = tmp.path().join("condostock_concurrency.db");

    let cfg = AppConfig::new(
        format!("sqlite://{}?mode=rwc", db_path.display()),
        "test_secret_key_for_testing_purposes_only_32chars".to_string(),
        3600,
        "127.0.0.1".to_string(),
        0,
        "test".to_string(),
    );
    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .expect("db connect");
    db::run_migrations(&pool).await.expect("migrations");
    let db_arc = Arc::new(pool);

    let products = ProductService::new(db_arc.clone(), None);
    let product = products
        .create_or_restock(CreateProductInput {
            name: "Refrigerante".to_string(),
            barcode: "7999".to_string(),
            description: None,
            image_url: None,
            price: dec!(5.00),
            min_stock: None,
            quantity: 10,
            expiry_date: Some(Utc::now() + Duration::days(30)),
        })
        .await
        .expect("seed product");

    let sales = SaleService::new(db_arc, None);

    // 20 concurrent one-unit sales against 10 units; exactly 10 may commit.
    let mut tasks = Vec::new();
    for _ in 0..20 {
        let sales = sales.clone();
        let product_id = product.product.id;
        tasks.push(tokio::spawn(async move {
            sales
                .create_sale(CreateSaleInput {
                    items: vec![SaleLineInput {
                        product_id,
                        quantity: 1,
                    }],
                    payment_type: PaymentType::Cash,
                    resident_id: None,
                })
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap_or(false) {
            successes += 1;
        }
    }
    assert_eq!(successes, 10, "exactly 10 sales should commit");

    let remaining = products
        .get_product(product.product.id)
        .await
        .expect("product exists")
        .total_stock;
    assert_eq!(remaining, 0);
}
