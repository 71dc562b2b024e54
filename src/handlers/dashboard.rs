use axum::{extract::State, middleware, routing::get, Json, Router};

use crate::auth::require_admin;
use crate::errors::ServiceError;
use crate::services::dashboard::DashboardMetrics;
use crate::AppState;

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(metrics))
        .layer(middleware::from_fn(require_admin))
}

/// Revenue, sales count, receivables and low-stock alerts
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses((status = 200, description = "Store metrics", body = DashboardMetrics)),
    tag = "dashboard"
)]
pub async fn metrics(State(state): State<AppState>) -> Result<Json<DashboardMetrics>, ServiceError> {
    Ok(Json(state.services.dashboard.metrics().await?))
}
