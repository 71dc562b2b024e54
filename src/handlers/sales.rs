use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::require_admin;
use crate::errors::ServiceError;
use crate::handlers::common::validate_input;
use crate::services::sales::{CreateSaleInput, SaleWithItems};
use crate::AppState;

pub fn sales_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_sale))
        .route("/", get(list_sales))
        .route("/:id", get(get_sale))
        .layer(middleware::from_fn(require_admin))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SalesQuery {
    /// Restrict the listing to one resident's purchases.
    pub resident_id: Option<Uuid>,
}

/// Process a sale at the counter
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = CreateSaleInput,
    responses(
        (status = 201, description = "Sale committed", body = SaleWithItems),
        (status = 400, description = "Insufficient stock or credit limit exceeded"),
        (status = 404, description = "Unknown product or account"),
        (status = 409, description = "Blocked account or concurrent stock change"),
    ),
    tag = "sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    Json(payload): Json<CreateSaleInput>,
) -> Result<(StatusCode, Json<SaleWithItems>), ServiceError> {
    validate_input(&payload)?;
    let sale = state.services.sales.create_sale(payload).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// List sales, newest first
#[utoipa::path(
    get,
    path = "/api/v1/sales",
    params(SalesQuery),
    responses((status = 200, description = "Sales with their items", body = [SaleWithItems])),
    tag = "sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SalesQuery>,
) -> Result<Json<Vec<SaleWithItems>>, ServiceError> {
    Ok(Json(state.services.sales.list_sales(query.resident_id).await?))
}

/// Get one sale with its items
#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale id")),
    responses(
        (status = 200, description = "The sale", body = SaleWithItems),
        (status = 404, description = "Unknown sale"),
    ),
    tag = "sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SaleWithItems>, ServiceError> {
    Ok(Json(state.services.sales.get_sale(id).await?))
}
