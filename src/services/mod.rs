//! Business logic services.
//!
//! Each service is a cheaply clonable handle over the shared database
//! connection. Anything that touches more than one table runs inside a
//! single transaction owned by the service method.

pub mod accounts;
pub mod dashboard;
pub mod products;
pub mod residents;
pub mod sales;
pub mod stocks;
