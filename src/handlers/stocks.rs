use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use uuid::Uuid;

use crate::auth::require_admin;
use crate::entities::stock;
use crate::errors::ServiceError;
use crate::handlers::common::validate_input;
use crate::services::stocks::{CreateStockEntryInput, StockEntryView, UpdateStockInput};
use crate::AppState;

pub fn stocks_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_entry))
        .route("/", get(list_entries))
        .route("/:id", put(update_quantity))
        .route("/:id", delete(delete_entry))
        .layer(middleware::from_fn(require_admin))
}

/// Record a received lot for an existing product
#[utoipa::path(
    post,
    path = "/api/v1/stocks",
    request_body = CreateStockEntryInput,
    responses(
        (status = 201, description = "Stock entry recorded", body = StockEntryView),
        (status = 404, description = "Unknown product"),
    ),
    tag = "stocks"
)]
pub async fn create_entry(
    State(state): State<AppState>,
    Json(payload): Json<CreateStockEntryInput>,
) -> Result<(StatusCode, Json<StockEntryView>), ServiceError> {
    validate_input(&payload)?;
    let created = state.services.stocks.create_entry(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List stock entries in expiry order
#[utoipa::path(
    get,
    path = "/api/v1/stocks",
    responses((status = 200, description = "All stock entries", body = [StockEntryView])),
    tag = "stocks"
)]
pub async fn list_entries(
    State(state): State<AppState>,
) -> Result<Json<Vec<StockEntryView>>, ServiceError> {
    Ok(Json(state.services.stocks.list_entries().await?))
}

/// Correct the quantity of one stock entry
#[utoipa::path(
    put,
    path = "/api/v1/stocks/{id}",
    params(("id" = Uuid, Path, description = "Stock entry id")),
    request_body = UpdateStockInput,
    responses(
        (status = 200, description = "Updated stock entry", body = stock::Model),
        (status = 404, description = "Unknown stock entry"),
    ),
    tag = "stocks"
)]
pub async fn update_quantity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStockInput>,
) -> Result<Json<stock::Model>, ServiceError> {
    validate_input(&payload)?;
    Ok(Json(state.services.stocks.update_quantity(id, payload).await?))
}

/// Delete a stock entry and its batch
#[utoipa::path(
    delete,
    path = "/api/v1/stocks/{id}",
    params(("id" = Uuid, Path, description = "Stock entry id")),
    responses(
        (status = 204, description = "Stock entry removed"),
        (status = 404, description = "Unknown stock entry"),
    ),
    tag = "stocks"
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.stocks.delete_entry(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
