use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    batch::{self, Entity as Batch},
    product::{self, Entity as Product},
    sale_item::{self, Entity as SaleItem},
    stock::{self, Entity as Stock},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Request body for registering a product or restocking by barcode.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 120, message = "Product name must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "Barcode is required"))]
    pub barcode: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub min_stock: Option<i32>,
    /// Units received with this registration. Zero creates the product with
    /// no stock.
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    /// Expiry of the received batch; defaults to one year out.
    pub expiry_date: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 120, message = "Product name must be between 1 and 120 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
    pub min_stock: Option<i32>,
}

/// A product together with the sum of its batch stocks.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductWithStock {
    #[serde(flatten)]
    pub product: product::Model,
    pub total_stock: i64,
}

#[derive(Debug, Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Registers a product, or restocks it when the barcode is already
    /// known. Either way a new batch is created for the received units, so
    /// repeated scans of the same barcode accumulate independently expiring
    /// lots.
    #[instrument(skip(self, input), fields(barcode = %input.barcode))]
    pub async fn create_or_restock(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductWithStock, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let existing = Product::find()
            .filter(product::Column::Barcode.eq(input.barcode.clone()))
            .one(&txn)
            .await?;

        let product_row = match existing {
            Some(found) => {
                info!(product_id = %found.id, "Barcode already registered, adding batch");
                // A restock scan carries the current shelf price.
                let mut active: product::ActiveModel = found.into();
                active.price = Set(input.price);
                active.updated_at = Set(Some(Utc::now()));
                active.update(&txn).await?
            }
            None => {
                let model = product::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(input.name.clone()),
                    barcode: Set(input.barcode.clone()),
                    description: Set(input.description.clone()),
                    image_url: Set(input.image_url.clone()),
                    price: Set(input.price),
                    min_stock: Set(input.min_stock.unwrap_or(5)),
                    created_at: Set(Utc::now()),
                    updated_at: Set(None),
                };
                model.insert(&txn).await?
            }
        };

        if input.quantity > 0 {
            let expiry = input
                .expiry_date
                .unwrap_or_else(|| Utc::now() + Duration::days(365));
            let batch_id = create_batch_with_stock(
                &txn,
                product_row.id,
                auto_batch_code(),
                expiry,
                input.quantity,
            )
            .await?;

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
        }

        txn.commit().await?;

        let total_stock = self.total_stock(product_row.id).await?;
        Ok(ProductWithStock {
            product: product_row,
            total_stock,
        })
    }

    /// Lists every product with its aggregate stock, newest first.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductWithStock>, ServiceError> {
        let products = Product::find()
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut out = Vec::with_capacity(products.len());
        for p in products {
            let total_stock = self.total_stock(p.id).await?;
            out.push(ProductWithStock {
                product: p,
                total_stock,
            });
        }
        Ok(out)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<ProductWithStock, ServiceError> {
        let product_row = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;
        let total_stock = self.total_stock(id).await?;
        Ok(ProductWithStock {
            product: product_row,
            total_stock,
        })
    }

    /// Barcode lookup used by the point-of-sale scanner.
    pub async fn get_by_barcode(&self, barcode: &str) -> Result<ProductWithStock, ServiceError> {
        let product_row = Product::find()
            .filter(product::Column::Barcode.eq(barcode))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with barcode {} not found", barcode)))?;
        let total_stock = self.total_stock(product_row.id).await?;
        Ok(ProductWithStock {
            product: product_row,
            total_stock,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;

        let product_row = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        let mut active: product::ActiveModel = product_row.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(image_url) = input.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(min_stock) = input.min_stock {
            active.min_stock = Set(min_stock);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db).await?)
    }

    /// Removes a product and everything hanging off it: stocks, batches and
    /// historical sale items. Children go first so foreign keys hold at every
    /// point of the transaction.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let product_row = Product::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        let batch_ids: Vec<Uuid> = Batch::find()
            .filter(batch::Column::ProductId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();

        if !batch_ids.is_empty() {
            Stock::delete_many()
                .filter(stock::Column::BatchId.is_in(batch_ids.clone()))
                .exec(&txn)
                .await?;
            Batch::delete_many()
                .filter(batch::Column::Id.is_in(batch_ids))
                .exec(&txn)
                .await?;
        }

        SaleItem::delete_many()
            .filter(sale_item::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;

        Product::delete_by_id(product_row.id).exec(&txn).await?;

        txn.commit().await?;
        info!(product_id = %id, "Product removed with batches and stock");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::ProductDeleted(id)).await {
                warn!("Failed to emit product event: {}", e);
            }
        }

        Ok(())
    }

    async fn total_stock(&self, product_id: Uuid) -> Result<i64, ServiceError> {
        let rows = Batch::find()
            .filter(batch::Column::ProductId.eq(product_id))
            .find_also_related(Stock)
            .all(&*self.db)
            .await?;
        Ok(rows
            .iter()
            .filter_map(|(_, s)| s.as_ref())
            .map(|s| i64::from(s.quantity))
            .sum())
    }
}

/// Inserts a batch and its single stock row; shared with the stock entry
/// service.
pub(crate) async fn create_batch_with_stock(
    txn: &DatabaseTransaction,
    product_id: Uuid,
    code: String,
    expiry_date: chrono::DateTime<Utc>,
    quantity: i32,
) -> Result<Uuid, ServiceError> {
    let batch_model = batch::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        expiry_date: Set(expiry_date),
        product_id: Set(product_id),
        created_at: Set(Utc::now()),
    };
    let saved_batch = batch_model.insert(txn).await?;

    let stock_model = stock::ActiveModel {
        id: Set(Uuid::new_v4()),
        batch_id: Set(saved_batch.id),
        quantity: Set(quantity),
        updated_at: Set(None),
    };
    stock_model.insert(txn).await?;

    Ok(saved_batch.id)
}

/// Auto-generated lot code for barcode-driven restocks.
fn auto_batch_code() -> String {
    format!("LOTE-{}", Utc::now().timestamp_millis())
}
