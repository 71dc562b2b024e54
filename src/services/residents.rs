use chrono::Utc;
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

use crate::auth::hash_password;
use crate::entities::{
    account::{self, Entity as Account},
    resident::{self, Entity as Resident},
    sale::{self, Entity as Sale},
    sale_item::{self, Entity as SaleItem},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{parse_enum, AccessStatus, AccountStatus, Role, UnitRole};

/// Request body for the administrator registering a unit owner.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateResidentInput {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(length(min = 11, max = 14, message = "CPF must have 11 digits"))]
    pub cpf: String,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "Apartment is required"))]
    pub apartment: String,
    #[validate(length(min = 1, message = "Block is required"))]
    pub block: String,
    /// Tab ceiling for the new account; falls back to the configured default.
    pub credit_limit: Option<Decimal>,
}

/// Request body for a unit owner asking access for a household member.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RequestDependentInput {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(length(min = 11, max = 14, message = "CPF must have 11 digits"))]
    pub cpf: String,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateResidentInput {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub apartment: Option<String>,
    pub block: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateStatusInput {
    pub status: AccessStatus,
}

/// A resident together with their tab account.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResidentWithAccount {
    #[serde(flatten)]
    pub resident: resident::Model,
    pub account: Option<account::Model>,
}

/// One household: the unit owner and everyone they sponsor.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnitView {
    pub owner: ResidentWithAccount,
    pub dependents: Vec<ResidentWithAccount>,
}

#[derive(Debug, Clone)]
pub struct ResidentService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
    default_credit_limit: Decimal,
}

impl ResidentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Option<EventSender>,
        default_credit_limit: Decimal,
    ) -> Self {
        Self {
            db,
            event_sender,
            default_credit_limit,
        }
    }

    /// Registers a unit owner with an active account. The initial password is
    /// derived from the CPF and must be changed on first login.
    #[instrument(skip(self, input), fields(apartment = %input.apartment, block = %input.block))]
    pub async fn create_resident(
        &self,
        input: CreateResidentInput,
    ) -> Result<ResidentWithAccount, ServiceError> {
        input.validate()?;
        let cpf = clean_cpf(&input.cpf)?;

        let txn = self.db.begin().await?;
        self.ensure_cpf_free(&txn, &cpf).await?;

        let resident_row = insert_resident(
            &txn,
            NewResident {
                cpf: &cpf,
                name: &input.name,
                email: input.email.clone(),
                phone: input.phone.clone(),
                role: Role::Resident,
                unit_role: UnitRole::Owner,
                status: AccessStatus::Active,
                apartment: &input.apartment,
                block: &input.block,
                owner_id: None,
            },
        )
        .await?;

        let account_row = insert_account(
            &txn,
            resident_row.id,
            input.credit_limit.unwrap_or(self.default_credit_limit),
        )
        .await?;

        txn.commit().await?;
        info!(resident_id = %resident_row.id, "Resident registered");

        Ok(ResidentWithAccount {
            resident: resident_row,
            account: Some(account_row),
        })
    }

    /// A unit owner requests access for a household member. The dependent
    /// inherits the unit and stays PENDING until the administrator decides.
    #[instrument(skip(self, input))]
    pub async fn request_dependent(
        &self,
        requester_id: Uuid,
        input: RequestDependentInput,
    ) -> Result<ResidentWithAccount, ServiceError> {
        input.validate()?;
        let cpf = clean_cpf(&input.cpf)?;

        let txn = self.db.begin().await?;

        let owner = Resident::find_by_id(requester_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Requesting resident not found".to_string()))?;
        let unit_role: UnitRole = parse_enum(&owner.unit_role, "unit role")?;
        if unit_role != UnitRole::Owner {
            return Err(ServiceError::Forbidden(
                "Only the unit owner can request dependents".to_string(),
            ));
        }

        self.ensure_cpf_free(&txn, &cpf).await?;

        let resident_row = insert_resident(
            &txn,
            NewResident {
                cpf: &cpf,
                name: &input.name,
                email: input.email.clone(),
                phone: input.phone.clone(),
                role: Role::Resident,
                unit_role: UnitRole::Member,
                status: AccessStatus::Pending,
                apartment: &owner.apartment,
                block: &owner.block,
                owner_id: Some(owner.id),
            },
        )
        .await?;

        let account_row = insert_account(&txn, resident_row.id, self.default_credit_limit).await?;

        txn.commit().await?;
        info!(dependent_id = %resident_row.id, owner_id = %owner.id, "Dependent access requested");

        Ok(ResidentWithAccount {
            resident: resident_row,
            account: Some(account_row),
        })
    }

    /// Approves or rejects a pending access request.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        input: UpdateStatusInput,
    ) -> Result<resident::Model, ServiceError> {
        let resident_row = Resident::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Resident {} not found", id)))?;

        let new_status = input.status.to_string();
        let mut active: resident::ActiveModel = resident_row.into();
        active.status = Set(new_status.clone());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        if let Some(sender) = &self.event_sender {
            let event = Event::ResidentStatusChanged {
                resident_id: id,
                new_status,
            };
            if let Err(e) = sender.send(event).await {
                warn!("Failed to emit status event: {}", e);
            }
        }

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn list_residents(&self) -> Result<Vec<ResidentWithAccount>, ServiceError> {
        let rows = Resident::find()
            .find_also_related(Account)
            .order_by_asc(resident::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(resident, account)| ResidentWithAccount { resident, account })
            .collect())
    }

    pub async fn get_resident(&self, id: Uuid) -> Result<ResidentWithAccount, ServiceError> {
        let (resident_row, account_row) = Resident::find_by_id(id)
            .find_also_related(Account)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Resident {} not found", id)))?;
        Ok(ResidentWithAccount {
            resident: resident_row,
            account: account_row,
        })
    }

    /// Pending dependent requests awaiting the administrator.
    pub async fn pending_requests(&self) -> Result<Vec<ResidentWithAccount>, ServiceError> {
        let rows = Resident::find()
            .filter(resident::Column::Status.eq(AccessStatus::Pending.to_string()))
            .find_also_related(Account)
            .order_by_asc(resident::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(resident, account)| ResidentWithAccount { resident, account })
            .collect())
    }

    /// Resolves the caller's household: the unit owner plus all dependents,
    /// whoever is asking.
    #[instrument(skip(self))]
    pub async fn my_unit(&self, resident_id: Uuid) -> Result<UnitView, ServiceError> {
        let me = Resident::find_by_id(resident_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Resident {} not found", resident_id)))?;

        let owner_id = me.owner_id.unwrap_or(me.id);
        let owner = self.get_resident(owner_id).await?;

        let dependents = Resident::find()
            .filter(resident::Column::OwnerId.eq(owner_id))
            .find_also_related(Account)
            .order_by_asc(resident::Column::Name)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|(resident, account)| ResidentWithAccount { resident, account })
            .collect();

        Ok(UnitView { owner, dependents })
    }

    #[instrument(skip(self, input))]
    pub async fn update_resident(
        &self,
        id: Uuid,
        input: UpdateResidentInput,
    ) -> Result<resident::Model, ServiceError> {
        input.validate()?;

        let resident_row = Resident::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Resident {} not found", id)))?;

        let mut active: resident::ActiveModel = resident_row.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(email) = input.email {
            active.email = Set(Some(email));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(apartment) = input.apartment {
            active.apartment = Set(apartment);
        }
        if let Some(block) = input.block {
            active.block = Set(block);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db).await?)
    }

    /// Removes a resident and everything owned by them: dependents first
    /// (with their sales and accounts), then the resident's own sales,
    /// account, and finally the resident row.
    #[instrument(skip(self))]
    pub async fn delete_resident(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let resident_row = Resident::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Resident {} not found", id)))?;

        let dependents = Resident::find()
            .filter(resident::Column::OwnerId.eq(id))
            .all(&txn)
            .await?;

        for dependent in &dependents {
            delete_resident_data(&txn, dependent.id).await?;
            Resident::delete_by_id(dependent.id).exec(&txn).await?;
        }

        delete_resident_data(&txn, resident_row.id).await?;
        Resident::delete_by_id(resident_row.id).exec(&txn).await?;

        txn.commit().await?;
        info!(resident_id = %id, dependents = dependents.len(), "Resident removed");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::ResidentDeleted(id)).await {
                warn!("Failed to emit resident event: {}", e);
            }
        }

        Ok(())
    }

    async fn ensure_cpf_free(
        &self,
        txn: &DatabaseTransaction,
        cpf: &str,
    ) -> Result<(), ServiceError> {
        let existing = Resident::find()
            .filter(resident::Column::Cpf.eq(cpf))
            .one(txn)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "CPF {} is already registered",
                cpf
            )));
        }
        Ok(())
    }
}

struct NewResident<'a> {
    cpf: &'a str,
    name: &'a str,
    email: Option<String>,
    phone: Option<String>,
    role: Role,
    unit_role: UnitRole,
    status: AccessStatus,
    apartment: &'a str,
    block: &'a str,
    owner_id: Option<Uuid>,
}

async fn insert_resident(
    txn: &DatabaseTransaction,
    new: NewResident<'_>,
) -> Result<resident::Model, ServiceError> {
    let password_hash = hash_password(&default_password(new.cpf))
        .map_err(|e| ServiceError::HashError(e.to_string()))?;

    let model = resident::ActiveModel {
        id: Set(Uuid::new_v4()),
        cpf: Set(new.cpf.to_string()),
        name: Set(new.name.to_string()),
        email: Set(new.email),
        phone: Set(new.phone),
        password_hash: Set(password_hash),
        role: Set(new.role.to_string()),
        unit_role: Set(new.unit_role.to_string()),
        status: Set(new.status.to_string()),
        apartment: Set(new.apartment.to_string()),
        block: Set(new.block.to_string()),
        owner_id: Set(new.owner_id),
        is_first_login: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    };
    Ok(model.insert(txn).await?)
}

async fn insert_account(
    txn: &DatabaseTransaction,
    resident_id: Uuid,
    credit_limit: Decimal,
) -> Result<account::Model, ServiceError> {
    let model = account::ActiveModel {
        id: Set(Uuid::new_v4()),
        resident_id: Set(resident_id),
        balance: Set(Decimal::ZERO),
        credit_limit: Set(credit_limit),
        status: Set(AccountStatus::Active.to_string()),
    };
    Ok(model.insert(txn).await?)
}

/// Deletes the sales (with items) and the account of one resident.
async fn delete_resident_data(
    txn: &DatabaseTransaction,
    resident_id: Uuid,
) -> Result<(), ServiceError> {
    let sale_ids: Vec<Uuid> = Sale::find()
        .filter(sale::Column::ResidentId.eq(resident_id))
        .all(txn)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();

    if !sale_ids.is_empty() {
        SaleItem::delete_many()
            .filter(sale_item::Column::SaleId.is_in(sale_ids.clone()))
            .exec(txn)
            .await?;
        Sale::delete_many()
            .filter(sale::Column::Id.is_in(sale_ids))
            .exec(txn)
            .await?;
    }

    Account::delete_many()
        .filter(account::Column::ResidentId.eq(resident_id))
        .exec(txn)
        .await?;

    Ok(())
}

/// Strips formatting and checks the CPF has exactly 11 digits.
pub fn clean_cpf(raw: &str) -> Result<String, ServiceError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 11 {
        return Err(ServiceError::ValidationError(
            "CPF must have exactly 11 digits".to_string(),
        ));
    }
    Ok(digits)
}

/// Initial password for a new resident: the first four CPF digits.
pub fn default_password(cpf: &str) -> String {
    cpf.chars().take(4).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_cpf_strips_formatting() {
        assert_eq!(clean_cpf("123.456.789-01").unwrap(), "12345678901");
    }

    #[test]
    fn clean_cpf_rejects_wrong_length() {
        assert!(clean_cpf("12345").is_err());
        assert!(clean_cpf("123456789012").is_err());
    }

    #[test]
    fn default_password_is_first_four_digits() {
        assert_eq!(default_password("12345678901"), "1234");
    }
}
