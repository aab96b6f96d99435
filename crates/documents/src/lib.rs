//! Warehouse documents domain module.
//!
//! Orders, incoming/outgoing shipments and transfers: their per-type status
//! lifecycle, line items, batches and derived totals. Pure domain logic (no IO,
//! no HTTP, no storage).

pub mod document;
pub mod line_item;
pub mod status;
pub mod totals;

pub use document::{Counterpart, Document, DocumentFilter, NewDocument, StockMovement, WarehouseRef};
pub use line_item::{Batch, DocumentLineItem, LineItemPatch, NewBatch, NewLineItem};
pub use status::{
    DocumentStatus, DocumentType, IncomingStatus, OrderStatus, OutgoingStatus, TransferStatus,
    validate_transition,
};
pub use totals::{DocTotals, compute_totals};
