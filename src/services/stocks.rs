use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    batch::{self, Entity as Batch},
    product::Entity as Product,
    stock::{self, Entity as Stock},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::products::create_batch_with_stock;

/// Request body for a manual stock entry against an existing product.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStockEntryInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub expiry_date: DateTime<Utc>,
    /// Lot code printed on the packaging; auto-generated when omitted.
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateStockInput {
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
}

/// Flattened view of one batch and its stock, as shown on the stock screen.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockEntryView {
    pub stock_id: Uuid,
    pub batch_id: Uuid,
    pub batch_code: String,
    pub expiry_date: DateTime<Utc>,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl StockService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Records a received lot: one new batch plus its stock row.
    #[instrument(skip(self, input), fields(product_id = %input.product_id, quantity = input.quantity))]
    pub async fn create_entry(
        &self,
        input: CreateStockEntryInput,
    ) -> Result<StockEntryView, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let product_row = Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let code = input
            .code
            .clone()
            .unwrap_or_else(|| format!("LOTE-{}", Utc::now().timestamp_millis()));
        let batch_id = create_batch_with_stock(
            &txn,
            product_row.id,
            code.clone(),
            input.expiry_date,
            input.quantity,
        )
        .await?;

        txn.commit().await?;
        info!(batch_id = %batch_id, "Stock entry recorded");

        if let Some(sender) = &self.event_sender {
            let event = Event::StockReceived {
                product_id: product_row.id,
                batch_id,
                quantity: input.quantity,
            };
            if let Err(e) = sender.send(event).await {
                warn!("Failed to emit stock event: {}", e);
            }
        }

        let stock_row = Stock::find()
            .filter(stock::Column::BatchId.eq(batch_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::InternalError("Stock row missing after insert".into()))?;

        Ok(StockEntryView {
            stock_id: stock_row.id,
            batch_id,
            batch_code: code,
            expiry_date: input.expiry_date,
            product_id: product_row.id,
            product_name: product_row.name,
            quantity: stock_row.quantity,
        })
    }

    /// Lists all stock entries ordered by expiry, soonest first, so the
    /// screen mirrors the order sales will consume them.
    #[instrument(skip(self))]
    pub async fn list_entries(&self) -> Result<Vec<StockEntryView>, ServiceError> {
        let rows = Batch::find()
            .find_also_related(Stock)
            .order_by_asc(batch::Column::ExpiryDate)
            .all(&*self.db)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for (batch_row, stock_row) in rows {
            let Some(stock_row) = stock_row else { continue };
            let product_row = Product::find_by_id(batch_row.product_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "Batch {} references missing product",
                        batch_row.id
                    ))
                })?;
            out.push(StockEntryView {
                stock_id: stock_row.id,
                batch_id: batch_row.id,
                batch_code: batch_row.code,
                expiry_date: batch_row.expiry_date,
                product_id: product_row.id,
                product_name: product_row.name,
                quantity: stock_row.quantity,
            });
        }
        Ok(out)
    }

    /// Sets the absolute quantity of one stock row (inventory correction).
    #[instrument(skip(self, input))]
    pub async fn update_quantity(
        &self,
        stock_id: Uuid,
        input: UpdateStockInput,
    ) -> Result<stock::Model, ServiceError> {
        input.validate()?;

        let stock_row = Stock::find_by_id(stock_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock entry {} not found", stock_id)))?;

        let mut active: stock::ActiveModel = stock_row.into();
        active.quantity = Set(input.quantity);
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(&*self.db).await?)
    }

    /// Deletes a stock entry together with its batch.
    #[instrument(skip(self))]
    pub async fn delete_entry(&self, stock_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let stock_row = Stock::find_by_id(stock_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock entry {} not found", stock_id)))?;

        Stock::delete_by_id(stock_row.id).exec(&txn).await?;
        Batch::delete_by_id(stock_row.batch_id).exec(&txn).await?;

        txn.commit().await?;
        info!(stock_id = %stock_id, "Stock entry removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_quantity_entry_fails_validation() {
        let input = CreateStockEntryInput {
            product_id: Uuid::new_v4(),
            quantity: 0,
            expiry_date: Utc::now(),
            code: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn correction_to_zero_is_allowed() {
        let input = UpdateStockInput { quantity: 0 };
        assert!(input.validate().is_ok());
    }
}
