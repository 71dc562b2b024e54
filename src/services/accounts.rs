use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{
    account::{self, Entity as Account},
    resident::Entity as Resident,
};
use crate::errors::ServiceError;
use crate::models::AccountStatus;

/// Admin adjustments to a resident's tab account.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateAccountInput {
    pub credit_limit: Option<Decimal>,
    pub status: Option<AccountStatus>,
}

/// Payment received against an open tab. Omitting `amount` settles the
/// whole balance.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SettleInput {
    pub amount: Option<Decimal>,
}

/// An account joined with its resident's name, for the receivables screen.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountView {
    #[serde(flatten)]
    pub account: account::Model,
    pub resident_name: String,
}

#[derive(Debug, Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
}

impl AccountService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_accounts(&self) -> Result<Vec<AccountView>, ServiceError> {
        let rows = Account::find()
            .find_also_related(Resident)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(account, resident)| AccountView {
                account,
                resident_name: resident.map(|r| r.name).unwrap_or_default(),
            })
            .collect())
    }

    pub async fn get_account(&self, id: Uuid) -> Result<account::Model, ServiceError> {
        Account::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {} not found", id)))
    }

    pub async fn get_by_resident(&self, resident_id: Uuid) -> Result<account::Model, ServiceError> {
        Account::find()
            .filter(account::Column::ResidentId.eq(resident_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Account not found for resident {}", resident_id))
            })
    }

    /// Adjusts the credit limit or blocks/unblocks the account.
    #[instrument(skip(self, input))]
    pub async fn update_account(
        &self,
        id: Uuid,
        input: UpdateAccountInput,
    ) -> Result<account::Model, ServiceError> {
        let account_row = self.get_account(id).await?;

        if let Some(limit) = input.credit_limit {
            if limit < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Credit limit cannot be negative".to_string(),
                ));
            }
        }

        let mut active: account::ActiveModel = account_row.into();
        if let Some(limit) = input.credit_limit {
            active.credit_limit = Set(limit);
        }
        if let Some(status) = input.status {
            active.status = Set(status.to_string());
        }
        Ok(active.update(&*self.db).await?)
    }

    /// Records a payment against the tab. Partial amounts must not exceed
    /// the open balance; a settled tab never goes negative.
    #[instrument(skip(self, input))]
    pub async fn settle(
        &self,
        id: Uuid,
        input: SettleInput,
    ) -> Result<account::Model, ServiceError> {
        let account_row = self.get_account(id).await?;

        let amount = input.amount.unwrap_or(account_row.balance);
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be positive".to_string(),
            ));
        }
        if amount > account_row.balance {
            return Err(ServiceError::ValidationError(format!(
                "Payment of {} exceeds the open balance of {}",
                amount, account_row.balance
            )));
        }

        let new_balance = account_row.balance - amount;
        let account_id = account_row.id;
        let mut active: account::ActiveModel = account_row.into();
        active.balance = Set(new_balance);
        let updated = active.update(&*self.db).await?;

        info!(account_id = %account_id, amount = %amount, balance = %new_balance, "Tab payment recorded");
        Ok(updated)
    }
}
