pub mod accounts;
pub mod common;
pub mod dashboard;
pub mod health;
pub mod products;
pub mod residents;
pub mod sales;
pub mod stocks;

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub products: crate::services::products::ProductService,
    pub stocks: crate::services::stocks::StockService,
    pub sales: crate::services::sales::SaleService,
    pub residents: crate::services::residents::ResidentService,
    pub accounts: crate::services::accounts::AccountService,
    pub dashboard: crate::services::dashboard::DashboardService,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<EventSender>,
        default_credit_limit: Decimal,
    ) -> Self {
        Self {
            products: crate::services::products::ProductService::new(
                db.clone(),
                event_sender.clone(),
            ),
            stocks: crate::services::stocks::StockService::new(db.clone(), event_sender.clone()),
            sales: crate::services::sales::SaleService::new(db.clone(), event_sender.clone()),
            residents: crate::services::residents::ResidentService::new(
                db.clone(),
                event_sender,
                default_credit_limit,
            ),
            accounts: crate::services::accounts::AccountService::new(db.clone()),
            dashboard: crate::services::dashboard::DashboardService::new(db),
        }
    }
}
