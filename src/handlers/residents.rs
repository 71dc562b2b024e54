use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use uuid::Uuid;

use crate::auth::{require_admin, AuthUser};
use crate::entities::resident;
use crate::errors::ServiceError;
use crate::handlers::common::validate_input;
use crate::services::residents::{
    CreateResidentInput, RequestDependentInput, ResidentWithAccount, UnitView,
    UpdateResidentInput, UpdateStatusInput,
};
use crate::services::sales::SaleWithItems;
use crate::AppState;

pub fn residents_routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/", post(create_resident))
        .route("/", get(list_residents))
        .route("/pending", get(pending_requests))
        .route("/:id", get(get_resident))
        .route("/:id", put(update_resident))
        .route("/:id", delete(delete_resident))
        .route("/:id/status", patch(update_status))
        .layer(middleware::from_fn(require_admin));

    // Self-service routes come first so "my-unit" and "me" never match ":id".
    Router::new()
        .route("/my-unit", get(my_unit))
        .route("/me/history", get(my_history))
        .route("/dependents", post(request_dependent))
        .merge(admin)
}

/// Register a unit owner (admin)
#[utoipa::path(
    post,
    path = "/api/v1/residents",
    request_body = CreateResidentInput,
    responses(
        (status = 201, description = "Resident registered", body = ResidentWithAccount),
        (status = 409, description = "CPF already registered"),
    ),
    tag = "residents"
)]
pub async fn create_resident(
    State(state): State<AppState>,
    Json(payload): Json<CreateResidentInput>,
) -> Result<(StatusCode, Json<ResidentWithAccount>), ServiceError> {
    validate_input(&payload)?;
    let created = state.services.residents.create_resident(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List all residents with their accounts (admin)
#[utoipa::path(
    get,
    path = "/api/v1/residents",
    responses((status = 200, description = "All residents", body = [ResidentWithAccount])),
    tag = "residents"
)]
pub async fn list_residents(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResidentWithAccount>>, ServiceError> {
    Ok(Json(state.services.residents.list_residents().await?))
}

/// Pending dependent requests (admin)
#[utoipa::path(
    get,
    path = "/api/v1/residents/pending",
    responses((status = 200, description = "Requests awaiting a decision", body = [ResidentWithAccount])),
    tag = "residents"
)]
pub async fn pending_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResidentWithAccount>>, ServiceError> {
    Ok(Json(state.services.residents.pending_requests().await?))
}

/// Get one resident (admin)
#[utoipa::path(
    get,
    path = "/api/v1/residents/{id}",
    params(("id" = Uuid, Path, description = "Resident id")),
    responses(
        (status = 200, description = "The resident", body = ResidentWithAccount),
        (status = 404, description = "Unknown resident"),
    ),
    tag = "residents"
)]
pub async fn get_resident(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResidentWithAccount>, ServiceError> {
    Ok(Json(state.services.residents.get_resident(id).await?))
}

/// Update resident details (admin)
#[utoipa::path(
    put,
    path = "/api/v1/residents/{id}",
    params(("id" = Uuid, Path, description = "Resident id")),
    request_body = UpdateResidentInput,
    responses(
        (status = 200, description = "Updated resident", body = resident::Model),
        (status = 404, description = "Unknown resident"),
    ),
    tag = "residents"
)]
pub async fn update_resident(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateResidentInput>,
) -> Result<Json<resident::Model>, ServiceError> {
    validate_input(&payload)?;
    Ok(Json(state.services.residents.update_resident(id, payload).await?))
}

/// Approve or reject an access request (admin)
#[utoipa::path(
    patch,
    path = "/api/v1/residents/{id}/status",
    params(("id" = Uuid, Path, description = "Resident id")),
    request_body = UpdateStatusInput,
    responses(
        (status = 200, description = "Updated resident", body = resident::Model),
        (status = 404, description = "Unknown resident"),
    ),
    tag = "residents"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusInput>,
) -> Result<Json<resident::Model>, ServiceError> {
    Ok(Json(state.services.residents.update_status(id, payload).await?))
}

/// Remove a resident with dependents, sales and accounts (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/residents/{id}",
    params(("id" = Uuid, Path, description = "Resident id")),
    responses(
        (status = 204, description = "Resident removed"),
        (status = 404, description = "Unknown resident"),
    ),
    tag = "residents"
)]
pub async fn delete_resident(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.residents.delete_resident(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's household: owner plus dependents
#[utoipa::path(
    get,
    path = "/api/v1/residents/my-unit",
    responses((status = 200, description = "The caller's unit", body = UnitView)),
    tag = "residents"
)]
pub async fn my_unit(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UnitView>, ServiceError> {
    Ok(Json(state.services.residents.my_unit(user.resident_id).await?))
}

/// The caller's purchase history
#[utoipa::path(
    get,
    path = "/api/v1/residents/me/history",
    responses((status = 200, description = "The caller's sales", body = [SaleWithItems])),
    tag = "residents"
)]
pub async fn my_history(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<SaleWithItems>>, ServiceError> {
    Ok(Json(state.services.sales.list_sales(Some(user.resident_id)).await?))
}

/// Request store access for a household member (unit owner)
#[utoipa::path(
    post,
    path = "/api/v1/residents/dependents",
    request_body = RequestDependentInput,
    responses(
        (status = 201, description = "Request recorded as PENDING", body = ResidentWithAccount),
        (status = 403, description = "Caller is not a unit owner"),
        (status = 409, description = "CPF already registered"),
    ),
    tag = "residents"
)]
pub async fn request_dependent(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RequestDependentInput>,
) -> Result<(StatusCode, Json<ResidentWithAccount>), ServiceError> {
    validate_input(&payload)?;
    let created = state
        .services
        .residents
        .request_dependent(user.resident_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
