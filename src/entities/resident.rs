use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A store user: the administrator or a resident of the building. Dependents
/// reference the owner of their unit through `owner_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate, ToSchema)]
#[sea_orm(table_name = "residents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub cpf: String,

    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: String,

    pub email: Option<String>,
    pub phone: Option<String>,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: String,
    pub unit_role: String,
    pub status: String,
    pub apartment: String,
    pub block: String,
    pub owner_id: Option<Uuid>,
    pub is_first_login: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::account::Entity")]
    Account,
    #[sea_orm(has_many = "super::sale::Entity")]
    Sale,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::OwnerId",
        to = "Column::Id"
    )]
    Owner,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
