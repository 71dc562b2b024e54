use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use condostock_api::{
    app,
    auth::hash_password,
    config::AppConfig,
    db,
    entities::{account, resident},
    events::{self, EventSender},
    services::products::{CreateProductInput, ProductWithStock},
    services::residents::{CreateResidentInput, ResidentWithAccount},
    AppState,
};

pub const ADMIN_CPF: &str = "00000000000";
pub const ADMIN_PASSWORD: &str = "admin123";

/// Harness that spins up the full router against a fresh SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub admin: resident::Model,
    token: String,
    _tmp: tempfile::TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with a migrated, empty database and
    /// a seeded administrator.
    pub async fn new() -> Self {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let db_path = tmp.path().join("condostock_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3600,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(db_arc.clone(), cfg, Some(event_sender));

        let admin = seed_admin(&state).await;
        let token = state
            .auth
            .generate_token(&admin)
            .expect("generate admin token");

        let router = app(state.clone());

        Self {
            router,
            state,
            admin,
            token,
            _tmp: tmp,
            _event_task: event_task,
        }
    }

    /// Bearer token for the seeded administrator.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Issues a token for any resident, bypassing the login endpoint.
    pub fn token_for(&self, resident: &resident::Model) -> String {
        self.state
            .auth
            .generate_token(resident)
            .expect("generate token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for requests carrying the admin token.
    pub async fn admin_request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Seeds a product with one batch of `quantity` units expiring at
    /// `expiry`.
    pub async fn seed_product(
        &self,
        name: &str,
        barcode: &str,
        price: Decimal,
        quantity: i32,
        expiry: DateTime<Utc>,
    ) -> ProductWithStock {
        self.state
            .services
            .products
            .create_or_restock(CreateProductInput {
                name: name.to_string(),
                barcode: barcode.to_string(),
                description: None,
                image_url: None,
                price,
                min_stock: None,
                quantity,
                expiry_date: Some(expiry),
            })
            .await
            .expect("seed product")
    }

    /// Seeds an active unit owner with an account.
    pub async fn seed_resident(&self, name: &str, cpf: &str) -> ResidentWithAccount {
        self.state
            .services
            .residents
            .create_resident(CreateResidentInput {
                name: name.to_string(),
                cpf: cpf.to_string(),
                email: None,
                phone: None,
                apartment: "101".to_string(),
                block: "A".to_string(),
                credit_limit: None,
            })
            .await
            .expect("seed resident")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

async fn seed_admin(state: &AppState) -> resident::Model {
    let admin = resident::ActiveModel {
        id: Set(Uuid::new_v4()),
        cpf: Set(ADMIN_CPF.to_string()),
        name: Set("Sindico Geraldo".to_string()),
        email: Set(None),
        phone: Set(None),
        password_hash: Set(hash_password(ADMIN_PASSWORD).expect("hash admin password")),
        role: Set("ADMIN".to_string()),
        unit_role: Set("OWNER".to_string()),
        status: Set("ACTIVE".to_string()),
        apartment: Set("0".to_string()),
        block: Set("0".to_string()),
        owner_id: Set(None),
        is_first_login: Set(false),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    };
    let admin = admin.insert(&*state.db).await.expect("insert admin");

    let account = account::ActiveModel {
        id: Set(Uuid::new_v4()),
        resident_id: Set(admin.id),
        balance: Set(Decimal::ZERO),
        credit_limit: Set(Decimal::ZERO),
        status: Set("ACTIVE".to_string()),
    };
    account.insert(&*state.db).await.expect("insert admin account");

    admin
}

/// Reads a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is not valid JSON")
}

/// Reads a Decimal out of a JSON field, whatever the wire encoding.
pub fn decimal_of(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected a decimal field, got {other:?}"),
    }
}

/// Asserts the status and returns the JSON body.
pub async fn expect_json(response: axum::response::Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status, "unexpected response status");
    body_json(response).await
}
