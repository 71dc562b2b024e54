use chrono::{Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{
    account::Entity as Account,
    batch::{self, Entity as Batch},
    product::Entity as Product,
    sale::{self, Entity as Sale},
    stock::Entity as Stock,
};
use crate::errors::ServiceError;

/// Aggregates shown on the administrator's landing screen.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardMetrics {
    pub revenue_today: Decimal,
    pub revenue_month: Decimal,
    pub sales_today: u64,
    /// Sum of every open tab balance.
    pub total_receivable: Decimal,
    pub low_stock: Vec<LowStockProduct>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LowStockProduct {
    pub product_id: Uuid,
    pub name: String,
    pub total_stock: i64,
    pub min_stock: i32,
}

#[derive(Debug, Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn metrics(&self) -> Result<DashboardMetrics, ServiceError> {
        let now = Utc::now();
        let start_of_day = Utc
            .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
            .single()
            .ok_or_else(|| ServiceError::InternalError("Invalid clock reading".to_string()))?;
        let start_of_month = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .ok_or_else(|| ServiceError::InternalError("Invalid clock reading".to_string()))?;

        let month_sales = Sale::find()
            .filter(sale::Column::CreatedAt.gte(start_of_month))
            .all(&*self.db)
            .await?;

        let mut revenue_today = Decimal::ZERO;
        let mut revenue_month = Decimal::ZERO;
        let mut sales_today: u64 = 0;
        for s in &month_sales {
            revenue_month += s.total;
            if s.created_at >= start_of_day {
                revenue_today += s.total;
                sales_today += 1;
            }
        }

        let total_receivable = Account::find()
            .all(&*self.db)
            .await?
            .iter()
            .map(|a| a.balance)
            .sum();

        let low_stock = self.low_stock_products().await?;

        Ok(DashboardMetrics {
            revenue_today,
            revenue_month,
            sales_today,
            total_receivable,
            low_stock,
        })
    }

    /// Products whose aggregate stock fell to the reorder threshold.
    async fn low_stock_products(&self) -> Result<Vec<LowStockProduct>, ServiceError> {
        let products = Product::find().all(&*self.db).await?;

        let mut out = Vec::new();
        for p in products {
            let total_stock: i64 = Batch::find()
                .filter(batch::Column::ProductId.eq(p.id))
                .find_also_related(Stock)
                .all(&*self.db)
                .await?
                .iter()
                .filter_map(|(_, s)| s.as_ref())
                .map(|s| i64::from(s.quantity))
                .sum();

            if total_stock <= i64::from(p.min_stock) {
                out.push(LowStockProduct {
                    product_id: p.id,
                    name: p.name,
                    total_stock,
                    min_stock: p.min_stock,
                });
            }
        }
        Ok(out)
    }
}
