use axum::{
    extract::{Json, Path, State},
    middleware,
    routing::{get, patch, post},
    Router,
};
use uuid::Uuid;

use crate::auth::require_admin;
use crate::entities::account;
use crate::errors::ServiceError;
use crate::services::accounts::{AccountView, SettleInput, UpdateAccountInput};
use crate::AppState;

pub fn accounts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_accounts))
        .route("/:id", get(get_account))
        .route("/:id", patch(update_account))
        .route("/:id/settle", post(settle))
        .layer(middleware::from_fn(require_admin))
}

/// List every tab account with the resident's name
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    responses((status = 200, description = "All accounts", body = [AccountView])),
    tag = "accounts"
)]
pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountView>>, ServiceError> {
    Ok(Json(state.services.accounts.list_accounts().await?))
}

/// Get one account
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "The account", body = account::Model),
        (status = 404, description = "Unknown account"),
    ),
    tag = "accounts"
)]
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<account::Model>, ServiceError> {
    Ok(Json(state.services.accounts.get_account(id).await?))
}

/// Adjust credit limit or block the account
#[utoipa::path(
    patch,
    path = "/api/v1/accounts/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = UpdateAccountInput,
    responses(
        (status = 200, description = "Updated account", body = account::Model),
        (status = 404, description = "Unknown account"),
    ),
    tag = "accounts"
)]
pub async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAccountInput>,
) -> Result<Json<account::Model>, ServiceError> {
    Ok(Json(state.services.accounts.update_account(id, payload).await?))
}

/// Record a payment against the tab
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{id}/settle",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = SettleInput,
    responses(
        (status = 200, description = "Account after the payment", body = account::Model),
        (status = 400, description = "Amount not positive or above the balance"),
        (status = 404, description = "Unknown account"),
    ),
    tag = "accounts"
)]
pub async fn settle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SettleInput>,
) -> Result<Json<account::Model>, ServiceError> {
    Ok(Json(state.services.accounts.settle(id, payload).await?))
}
