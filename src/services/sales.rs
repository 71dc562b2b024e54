use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    account::{self, Entity as Account},
    batch::{self, Entity as Batch},
    product::{self, Entity as Product},
    sale::{self, Entity as Sale},
    sale_item::{self, Entity as SaleItem},
    stock::{self, Entity as Stock},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{parse_enum, AccountStatus, PaymentType, SaleStatus};

/// One cart line as submitted by the point-of-sale client.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SaleLineInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Request body for creating a sale.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSaleInput {
    #[validate(length(min = 1, message = "A sale needs at least one item"))]
    pub items: Vec<SaleLineInput>,
    pub payment_type: PaymentType,
    /// Required when `payment_type` is DEFERRED.
    pub resident_id: Option<Uuid>,
}

/// Product fields echoed on each line so receipts and history render
/// without a second lookup.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SaleLineProduct {
    pub id: Uuid,
    pub name: String,
    pub barcode: String,
}

/// One recorded line item with its product attached.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SaleItemView {
    #[serde(flatten)]
    pub item: sale_item::Model,
    pub product: Option<SaleLineProduct>,
}

/// A committed sale together with its line items.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: sale::Model,
    pub items: Vec<SaleItemView>,
}

#[derive(Debug, Clone)]
pub struct SaleService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl SaleService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Processes a sale: allocates stock batch by batch in expiry order,
    /// applies tab rules for deferred payments, and records the sale with its
    /// line items. Everything up to the commit happens in one transaction;
    /// any rule violation rolls the whole sale back.
    #[instrument(skip(self, input), fields(lines = input.items.len(), payment = %input.payment_type))]
    pub async fn create_sale(&self, input: CreateSaleInput) -> Result<SaleWithItems, ServiceError> {
        input.validate()?;
        for line in &input.items {
            line.validate()?;
        }

        if input.payment_type == PaymentType::Deferred && input.resident_id.is_none() {
            return Err(ServiceError::ValidationError(
                "Deferred sales require a resident".to_string(),
            ));
        }

        let txn = self.db.begin().await.map_err(|e| {
            error!("Failed to begin sale transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut total = Decimal::ZERO;
        let mut pending_items: Vec<(Uuid, i32, Decimal)> = Vec::with_capacity(input.items.len());

        for line in &input.items {
            let product = Product::find_by_id(line.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", line.product_id))
                })?;

            self.allocate_stock(&txn, &product, line.quantity).await?;

            total += product.price * Decimal::from(line.quantity);
            pending_items.push((product.id, line.quantity, product.price));
        }

        if input.payment_type == PaymentType::Deferred {
            // Checked above.
            let resident_id = input.resident_id.unwrap_or_default();
            self.charge_account(&txn, resident_id, total).await?;
        }

        let sale_model = sale::ActiveModel {
            id: Set(Uuid::new_v4()),
            total: Set(total),
            payment_type: Set(input.payment_type.to_string()),
            status: Set(SaleStatus::Completed.to_string()),
            resident_id: Set(input.resident_id),
            created_at: Set(Utc::now()),
        };
        let saved_sale = sale_model.insert(&txn).await?;

        let item_models: Vec<sale_item::ActiveModel> = pending_items
            .iter()
            .map(|(product_id, quantity, unit_price)| sale_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                sale_id: Set(saved_sale.id),
                product_id: Set(*product_id),
                quantity: Set(*quantity),
                unit_price: Set(*unit_price),
            })
            .collect();
        SaleItem::insert_many(item_models).exec(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit sale transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(sale_id = %saved_sale.id, total = %saved_sale.total, "Sale committed");

        // Post-commit notification; delivery failure never fails the sale.
        if let Some(sender) = &self.event_sender {
            let event = Event::SaleCompleted {
                sale_id: saved_sale.id,
                total: saved_sale.total,
                payment_type: saved_sale.payment_type.clone(),
                resident_id: saved_sale.resident_id,
                timestamp: saved_sale.created_at,
            };
            if let Err(e) = sender.send(event).await {
                warn!(sale_id = %saved_sale.id, "Failed to emit sale event: {}", e);
            }
        }

        let items = self.load_items(saved_sale.id).await?;

        Ok(SaleWithItems {
            sale: saved_sale,
            items,
        })
    }

    async fn load_items(&self, sale_id: Uuid) -> Result<Vec<SaleItemView>, ServiceError> {
        let rows = SaleItem::find()
            .filter(sale_item::Column::SaleId.eq(sale_id))
            .find_also_related(Product)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(item, found)| SaleItemView {
                item,
                product: found.map(|p| SaleLineProduct {
                    id: p.id,
                    name: p.name,
                    barcode: p.barcode,
                }),
            })
            .collect())
    }

    /// Walks the product's batches in expiry order and deducts `quantity`
    /// units across them. Each deduction is a guarded update; losing a race
    /// with a concurrent sale aborts the transaction instead of overselling.
    async fn allocate_stock(
        &self,
        txn: &DatabaseTransaction,
        product: &product::Model,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let batches = Batch::find()
            .filter(batch::Column::ProductId.eq(product.id))
            .find_also_related(Stock)
            .order_by_asc(batch::Column::ExpiryDate)
            .all(txn)
            .await?;

        let available: i64 = batches
            .iter()
            .filter_map(|(_, s)| s.as_ref())
            .map(|s| i64::from(s.quantity))
            .sum();
        if available < i64::from(quantity) {
            return Err(ServiceError::InsufficientStock(format!(
                "Insufficient stock for product {}. Available: {}",
                product.name, available
            )));
        }

        let mut remaining = quantity;
        for (_, stock_row) in batches {
            if remaining == 0 {
                break;
            }
            let Some(stock_row) = stock_row else { continue };
            if stock_row.quantity <= 0 {
                continue;
            }

            let take = remaining.min(stock_row.quantity);
            let result = Stock::update_many()
                .col_expr(
                    stock::Column::Quantity,
                    Expr::col(stock::Column::Quantity).sub(take),
                )
                .col_expr(stock::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(stock::Column::Id.eq(stock_row.id))
                .filter(stock::Column::Quantity.gte(take))
                .exec(txn)
                .await?;

            if result.rows_affected == 0 {
                warn!(
                    stock_id = %stock_row.id,
                    product = %product.name,
                    "Stock row changed under us; aborting sale"
                );
                return Err(ServiceError::Conflict(format!(
                    "Stock for product {} changed concurrently, please retry",
                    product.name
                )));
            }

            remaining -= take;
        }

        // The availability check above makes this unreachable unless a batch
        // row disappeared mid-walk.
        if remaining > 0 {
            return Err(ServiceError::Conflict(format!(
                "Stock for product {} changed concurrently, please retry",
                product.name
            )));
        }

        Ok(())
    }

    /// Applies tab rules and adds `amount` to the resident's balance.
    async fn charge_account(
        &self,
        txn: &DatabaseTransaction,
        resident_id: Uuid,
        amount: Decimal,
    ) -> Result<(), ServiceError> {
        let account_row = Account::find()
            .filter(account::Column::ResidentId.eq(resident_id))
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Account not found for resident {}", resident_id))
            })?;

        let status: AccountStatus = parse_enum(&account_row.status, "account status")?;
        if status == AccountStatus::Blocked {
            return Err(ServiceError::AccountBlocked(
                "Account is blocked for deferred purchases".to_string(),
            ));
        }

        let new_balance = account_row.balance + amount;
        if new_balance > account_row.credit_limit {
            return Err(ServiceError::CreditLimitExceeded(format!(
                "Purchase of {} would take the balance to {}, above the limit of {}",
                amount, new_balance, account_row.credit_limit
            )));
        }

        let mut active: account::ActiveModel = account_row.into();
        active.balance = Set(new_balance);
        active.update(txn).await?;

        Ok(())
    }

    pub async fn get_sale(&self, id: Uuid) -> Result<SaleWithItems, ServiceError> {
        let sale_row = Sale::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", id)))?;

        let items = self.load_items(id).await?;

        Ok(SaleWithItems {
            sale: sale_row,
            items,
        })
    }

    /// Lists sales, newest first, optionally restricted to one resident.
    #[instrument(skip(self))]
    pub async fn list_sales(
        &self,
        resident_id: Option<Uuid>,
    ) -> Result<Vec<SaleWithItems>, ServiceError> {
        let mut query = Sale::find().order_by_desc(sale::Column::CreatedAt);
        if let Some(resident_id) = resident_id {
            query = query.filter(sale::Column::ResidentId.eq(resident_id));
        }
        let sales = query.all(&*self.db).await?;

        let mut out = Vec::with_capacity(sales.len());
        for sale_row in sales {
            let items = self.load_items(sale_row.id).await?;
            out.push(SaleWithItems {
                sale: sale_row,
                items,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_sale_without_resident_is_invalid() {
        let input = CreateSaleInput {
            items: vec![SaleLineInput {
                product_id: Uuid::new_v4(),
                quantity: 1,
            }],
            payment_type: PaymentType::Deferred,
            resident_id: None,
        };
        // The validator derive passes; the service adds the pairing rule.
        assert!(input.validate().is_ok());
    }

    #[test]
    fn zero_quantity_line_fails_validation() {
        let line = SaleLineInput {
            product_id: Uuid::new_v4(),
            quantity: 0,
        };
        assert!(line.validate().is_err());
    }

    #[test]
    fn empty_cart_fails_validation() {
        let input = CreateSaleInput {
            items: vec![],
            payment_type: PaymentType::Cash,
            resident_id: None,
        };
        assert!(input.validate().is_err());
    }
}
