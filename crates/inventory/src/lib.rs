//! Inventory ledger domain module.
//!
//! Business rules for per (product, batch, warehouse) stock levels and the
//! movement log, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage). Stores apply these rules atomically.

pub mod record;
pub mod transaction;

pub use record::{InventoryRecord, ReservationRequest, StockDelta, StockKey, check_reservation};
pub use transaction::{TransactionLogEntry, TransactionType};
