//! OpenAPI document and Swagger UI wiring.

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{auth, entities, errors, handlers, models, services};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CondoStock API",
        version = "0.1.0",
        description = "Convenience-store backend for a residential condominium: \
            products with expiry-dated batches, first-expired-first-out sales, \
            resident tabs with credit limits, and household access management."
    ),
    paths(
        handlers::health::health,
        handlers::products::create_product,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::get_by_barcode,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::stocks::create_entry,
        handlers::stocks::list_entries,
        handlers::stocks::update_quantity,
        handlers::stocks::delete_entry,
        handlers::sales::create_sale,
        handlers::sales::list_sales,
        handlers::sales::get_sale,
        handlers::residents::create_resident,
        handlers::residents::list_residents,
        handlers::residents::pending_requests,
        handlers::residents::get_resident,
        handlers::residents::update_resident,
        handlers::residents::update_status,
        handlers::residents::delete_resident,
        handlers::residents::my_unit,
        handlers::residents::my_history,
        handlers::residents::request_dependent,
        handlers::accounts::list_accounts,
        handlers::accounts::get_account,
        handlers::accounts::update_account,
        handlers::accounts::settle,
        handlers::dashboard::metrics,
    ),
    components(schemas(
        errors::ErrorResponse,
        models::PaymentType,
        models::SaleStatus,
        models::Role,
        models::UnitRole,
        models::AccessStatus,
        models::AccountStatus,
        entities::product::Model,
        entities::batch::Model,
        entities::stock::Model,
        entities::sale::Model,
        entities::sale_item::Model,
        entities::resident::Model,
        entities::account::Model,
        auth::LoginRequest,
        auth::LoginResponse,
        auth::LoginUser,
        auth::ChangePasswordRequest,
        services::products::CreateProductInput,
        services::products::UpdateProductInput,
        services::products::ProductWithStock,
        services::stocks::CreateStockEntryInput,
        services::stocks::UpdateStockInput,
        services::stocks::StockEntryView,
        services::sales::SaleLineInput,
        services::sales::CreateSaleInput,
        services::sales::SaleLineProduct,
        services::sales::SaleItemView,
        services::sales::SaleWithItems,
        services::residents::CreateResidentInput,
        services::residents::RequestDependentInput,
        services::residents::UpdateResidentInput,
        services::residents::UpdateStatusInput,
        services::residents::ResidentWithAccount,
        services::residents::UnitView,
        services::accounts::UpdateAccountInput,
        services::accounts::SettleInput,
        services::accounts::AccountView,
        services::dashboard::DashboardMetrics,
        services::dashboard::LowStockProduct,
        handlers::health::HealthStatus,
    )),
    tags(
        (name = "health", description = "Liveness checks"),
        (name = "auth", description = "Login and password management"),
        (name = "products", description = "Product catalog and barcode restocking"),
        (name = "stocks", description = "Batch-level stock entries"),
        (name = "sales", description = "Point-of-sale processing"),
        (name = "residents", description = "Residents, dependents and access requests"),
        (name = "accounts", description = "Tab accounts and receivables"),
        (name = "dashboard", description = "Store metrics"),
    )
)]
pub struct ApiDoc;

/// Serves the interactive docs at `/docs` backed by the generated document.
pub fn swagger_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
