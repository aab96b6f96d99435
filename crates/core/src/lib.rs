//! `wareflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    AddressId, BatchId, CustomerId, DeliveryId, DeliveryItemId, DocumentId, LineItemId,
    ProductId, SupplierId, TransactionId, UserId, WarehouseId,
};

/// Stock quantity in base units. Signed so that deltas share the type.
pub type Quantity = i64;

/// Monetary amount in the smallest currency unit (e.g. cents).
pub type Money = i64;
