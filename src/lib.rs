/*!
 * # CondoStock API
 *
 * Backend for a condominium convenience store. Products are stocked in
 * expiry-dated batches and sold first-expired-first-out; residents can buy
 * on a tab bounded by a credit limit, and unit owners sponsor household
 * members whose access the administrator approves.
 */

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;

use axum::{http::header, Extension, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::{AuthConfig, AuthService};
use crate::db::DbPool;
use crate::events::EventSender;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: Option<EventSender>,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        db: Arc<DbPool>,
        config: config::AppConfig,
        event_sender: Option<EventSender>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(
            AuthConfig::new(
                config.jwt_secret.clone(),
                Duration::from_secs(config.jwt_expiration as u64),
            ),
            db.clone(),
        ));
        let services = handlers::AppServices::new(
            db.clone(),
            event_sender.clone(),
            config.default_credit_limit,
        );
        Self {
            db,
            config,
            event_sender,
            services,
            auth,
        }
    }
}

/// All authenticated `/api/v1` routes. Admin-only subsets carry their own
/// gate inside each handler module.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", handlers::products::products_routes())
        .nest("/stocks", handlers::stocks::stocks_routes())
        .nest("/sales", handlers::sales::sales_routes())
        .nest("/residents", handlers::residents::residents_routes())
        .nest("/accounts", handlers::accounts::accounts_routes())
        .nest("/dashboard", handlers::dashboard::dashboard_routes())
        .layer(axum::middleware::from_fn(auth::auth_middleware))
}

/// Builds the complete application router.
pub fn app(state: AppState) -> Router {
    let cors = build_cors(&state.config);
    let auth_router = auth::auth_routes().with_state(state.auth.clone());

    Router::new()
        .merge(handlers::health::health_routes())
        .merge(openapi::swagger_router())
        .nest("/api/v1/auth", auth_router)
        .nest("/api/v1", api_v1_routes())
        .layer(Extension(state.auth.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

fn build_cors(config: &config::AppConfig) -> CorsLayer {
    match config.cors_allowed_origins.as_deref() {
        Some(origins) if !origins.trim().is_empty() => {
            let parsed: Vec<_> = origins
                .split(',')
                .filter_map(|origin| {
                    origin.trim().parse().map_err(|_| {
                        warn!(origin = origin.trim(), "Ignoring unparsable CORS origin");
                    })
                    .ok()
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parsed))
                .allow_methods(Any)
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        }
        _ => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> AppState {
        let cfg = config::AppConfig::new(
            "sqlite::memory:".into(),
            "super_secure_jwt_secret_that_is_long_enough_123".into(),
            3600,
            "127.0.0.1".into(),
            0,
            "test".into(),
        );
        let db = Arc::new(sea_orm::DatabaseConnection::Disconnected);
        AppState::new(db, cfg, None)
    }

    #[test]
    fn app_router_builds() {
        let _router = app(test_state());
    }

    #[test]
    fn cors_accepts_origin_list() {
        let mut cfg = test_state().config;
        cfg.cors_allowed_origins = Some("https://store.example.com, bad origin".into());
        let _layer = build_cors(&cfg);
    }
}
