//! Database entities for the CondoStock store.
//!
//! Relations: a product owns many batches, each batch has exactly one stock
//! row, sales own their line items, and every resident has one account.
//! Deletion cascades are handled manually in the service layer.

pub mod account;
pub mod batch;
pub mod product;
pub mod resident;
pub mod sale;
pub mod sale_item;
pub mod stock;
