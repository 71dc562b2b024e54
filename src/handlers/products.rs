use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use uuid::Uuid;

use crate::auth::require_admin;
use crate::entities::product;
use crate::errors::ServiceError;
use crate::handlers::common::validate_input;
use crate::services::products::{CreateProductInput, ProductWithStock, UpdateProductInput};
use crate::AppState;

pub fn products_routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/", post(create_product))
        .route("/:id", put(update_product))
        .route("/:id", delete(delete_product))
        .layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .route("/barcode/:barcode", get(get_by_barcode))
        .merge(admin)
}

/// Register a product, or restock an existing barcode
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product registered or restocked", body = ProductWithStock),
        (status = 400, description = "Invalid payload"),
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<(StatusCode, Json<ProductWithStock>), ServiceError> {
    validate_input(&payload)?;
    let created = state.services.products.create_or_restock(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List products with aggregate stock
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses((status = 200, description = "All products", body = [ProductWithStock])),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductWithStock>>, ServiceError> {
    Ok(Json(state.services.products.list_products().await?))
}

/// Get one product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "The product", body = ProductWithStock),
        (status = 404, description = "Unknown product"),
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductWithStock>, ServiceError> {
    Ok(Json(state.services.products.get_product(id).await?))
}

/// Look a product up by barcode (point-of-sale scanner)
#[utoipa::path(
    get,
    path = "/api/v1/products/barcode/{barcode}",
    params(("barcode" = String, Path, description = "EAN barcode")),
    responses(
        (status = 200, description = "The product", body = ProductWithStock),
        (status = 404, description = "Unknown barcode"),
    ),
    tag = "products"
)]
pub async fn get_by_barcode(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<Json<ProductWithStock>, ServiceError> {
    Ok(Json(state.services.products.get_by_barcode(&barcode).await?))
}

/// Update product details
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Updated product", body = product::Model),
        (status = 404, description = "Unknown product"),
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<Json<product::Model>, ServiceError> {
    validate_input(&payload)?;
    Ok(Json(state.services.products.update_product(id, payload).await?))
}

/// Delete a product and all of its batches, stock and sale items
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product removed"),
        (status = 404, description = "Unknown product"),
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.products.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
