//! Domain enumerations stored as strings in the database.
//!
//! Entities keep plain `String` columns; services and handlers parse them
//! through these types so unknown values surface as validation errors
//! instead of leaking to clients.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// How a sale is settled. `Deferred` charges the resident's tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    CardCredit,
    CardDebit,
    InstantTransfer,
    Cash,
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Completed,
}

/// System-wide role: the administrator runs the store, residents buy from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Resident,
}

/// Role within a household: the unit owner or a dependent member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitRole {
    Owner,
    Member,
}

/// Approval state of a resident's access to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessStatus {
    Active,
    Pending,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Blocked,
}

/// Parse a stored enum column, mapping unknown values to a validation error.
pub fn parse_enum<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, ServiceError> {
    raw.parse()
        .map_err(|_| ServiceError::ValidationError(format!("Unknown {what}: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_type_round_trips_through_storage_format() {
        for (variant, text) in [
            (PaymentType::CardCredit, "CARD_CREDIT"),
            (PaymentType::CardDebit, "CARD_DEBIT"),
            (PaymentType::InstantTransfer, "INSTANT_TRANSFER"),
            (PaymentType::Cash, "CASH"),
            (PaymentType::Deferred, "DEFERRED"),
        ] {
            assert_eq!(variant.to_string(), text);
            assert_eq!(text.parse::<PaymentType>().unwrap(), variant);
        }
    }

    #[test]
    fn unknown_value_becomes_validation_error() {
        let err = parse_enum::<PaymentType>("BARTER", "payment type").unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
