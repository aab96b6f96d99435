use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{
    AddressId, CustomerId, DocumentId, DomainError, DomainResult, Entity, Money, Quantity,
    SupplierId, UserId, WarehouseId,
};
use wareflow_inventory::TransactionType;

use crate::status::{DocumentStatus, DocumentType};

/// Warehouse(s) a document moves stock in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseRef {
    Single(WarehouseId),
    Transfer { from: WarehouseId, to: WarehouseId },
}

impl WarehouseRef {
    /// Warehouse whose stock line items draw from (or add to).
    pub fn stock_warehouse(&self) -> WarehouseId {
        match self {
            WarehouseRef::Single(w) => *w,
            WarehouseRef::Transfer { from, .. } => *from,
        }
    }

    pub fn involves(&self, warehouse_id: WarehouseId) -> bool {
        match self {
            WarehouseRef::Single(w) => *w == warehouse_id,
            WarehouseRef::Transfer { from, to } => *from == warehouse_id || *to == warehouse_id,
        }
    }
}

/// Business partner on the other side of the document.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Counterpart {
    #[default]
    None,
    Customer(CustomerId),
    Supplier(SupplierId),
}

impl Counterpart {
    pub fn customer_id(&self) -> Option<CustomerId> {
        match self {
            Counterpart::Customer(id) => Some(*id),
            _ => None,
        }
    }
}

/// Stock effect of one line item quantity on its document's warehouse.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockMovement {
    pub warehouse_id: WarehouseId,
    pub delta: Quantity,
    pub transaction_type: TransactionType,
}

/// Input for creating a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub doc_type: DocumentType,
    pub warehouses: WarehouseRef,
    pub counterpart: Counterpart,
    pub address_id: Option<AddressId>,
}

/// A business transaction record with a type-specific status lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub doc_type: DocumentType,
    pub status: DocumentStatus,
    pub warehouses: WarehouseRef,
    pub counterpart: Counterpart,
    pub address_id: Option<AddressId>,
    /// Derived from line items; see `totals::compute_totals`.
    pub summ: Money,
    /// Derived from line items (total quantity).
    pub item_count: Quantity,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Build a new `Draft` document after validating its shape for the type.
    pub fn create(new: NewDocument, created_by: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        match (new.doc_type, new.warehouses) {
            (DocumentType::Transfer, WarehouseRef::Transfer { from, to }) => {
                if from == to {
                    return Err(DomainError::validation(
                        "transfer source and destination warehouses must differ",
                    ));
                }
            }
            (DocumentType::Transfer, WarehouseRef::Single(_)) => {
                return Err(DomainError::validation(
                    "transfer documents need a from/to warehouse pair",
                ));
            }
            (_, WarehouseRef::Transfer { .. }) => {
                return Err(DomainError::validation(
                    "only transfer documents take a from/to warehouse pair",
                ));
            }
            (_, WarehouseRef::Single(_)) => {}
        }

        match (new.doc_type, new.counterpart) {
            (_, Counterpart::None) => {}
            (DocumentType::Incoming, Counterpart::Supplier(_)) => {}
            (DocumentType::Outgoing | DocumentType::Order, Counterpart::Customer(_)) => {}
            (doc_type, _) => {
                return Err(DomainError::validation(format!(
                    "counterpart kind does not match a {doc_type} document"
                )));
            }
        }

        Ok(Self {
            id: DocumentId::new(),
            doc_type: new.doc_type,
            status: DocumentStatus::draft(new.doc_type),
            warehouses: new.warehouses,
            counterpart: new.counterpart,
            address_id: new.address_id,
            summ: 0,
            item_count: 0,
            created_at: now,
            created_by,
            updated_at: now,
        })
    }

    /// Stock effect of adding `quantity` units on this document.
    ///
    /// Incoming adds stock, outgoing and transfer documents draw it from their
    /// (source) warehouse. Orders do not move stock.
    pub fn stock_movement(&self, quantity: Quantity) -> Option<StockMovement> {
        let warehouse_id = self.warehouses.stock_warehouse();
        let (delta, transaction_type) = match self.doc_type {
            DocumentType::Order => return None,
            DocumentType::Incoming => (quantity, TransactionType::Incoming),
            DocumentType::Outgoing => (-quantity, TransactionType::Outgoing),
            DocumentType::Transfer => (-quantity, TransactionType::Transfer),
        };
        if delta == 0 {
            return None;
        }
        Some(StockMovement {
            warehouse_id,
            delta,
            transaction_type,
        })
    }

    /// Lines may only be added or changed while the document is not terminal.
    pub fn ensure_lines_editable(&self) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::validation(format!(
                "cannot change lines of a {} document in status {}",
                self.doc_type, self.status
            )));
        }
        Ok(())
    }
}

impl Entity for Document {
    type Id = DocumentId;

    fn id(&self) -> DocumentId {
        self.id
    }
}

/// Reporting filter for document listings. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub warehouse_id: Option<WarehouseId>,
    pub doc_type: Option<DocumentType>,
    pub status: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl DocumentFilter {
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(w) = self.warehouse_id {
            if !doc.warehouses.involves(w) {
                return false;
            }
        }
        if let Some(t) = self.doc_type {
            if doc.doc_type != t {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if doc.status.as_str() != status {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if doc.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if doc.created_at > to {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_doc(doc_type: DocumentType, warehouses: WarehouseRef, counterpart: Counterpart) -> NewDocument {
        NewDocument {
            doc_type,
            warehouses,
            counterpart,
            address_id: None,
        }
    }

    #[test]
    fn created_documents_start_in_draft_with_zero_totals() {
        let doc = Document::create(
            new_doc(
                DocumentType::Outgoing,
                WarehouseRef::Single(WarehouseId::new()),
                Counterpart::Customer(CustomerId::new()),
            ),
            UserId::new(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(doc.status, DocumentStatus::draft(DocumentType::Outgoing));
        assert_eq!(doc.summ, 0);
        assert_eq!(doc.item_count, 0);
    }

    #[test]
    fn transfer_requires_distinct_pair() {
        let w = WarehouseId::new();
        let err = Document::create(
            new_doc(DocumentType::Transfer, WarehouseRef::Transfer { from: w, to: w }, Counterpart::None),
            UserId::new(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = Document::create(
            new_doc(DocumentType::Transfer, WarehouseRef::Single(w), Counterpart::None),
            UserId::new(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn incoming_rejects_customer_counterpart() {
        let err = Document::create(
            new_doc(
                DocumentType::Incoming,
                WarehouseRef::Single(WarehouseId::new()),
                Counterpart::Customer(CustomerId::new()),
            ),
            UserId::new(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn stock_movement_sign_follows_document_type() {
        let from = WarehouseId::new();
        let to = WarehouseId::new();
        let make = |doc_type, warehouses| {
            Document::create(new_doc(doc_type, warehouses, Counterpart::None), UserId::new(), Utc::now())
                .unwrap()
        };

        let incoming = make(DocumentType::Incoming, WarehouseRef::Single(from));
        let outgoing = make(DocumentType::Outgoing, WarehouseRef::Single(from));
        let transfer = make(DocumentType::Transfer, WarehouseRef::Transfer { from, to });
        let order = make(DocumentType::Order, WarehouseRef::Single(from));

        assert_eq!(incoming.stock_movement(5).unwrap().delta, 5);
        assert_eq!(outgoing.stock_movement(5).unwrap().delta, -5);

        let t = transfer.stock_movement(5).unwrap();
        assert_eq!(t.delta, -5);
        assert_eq!(t.warehouse_id, from);
        assert_eq!(t.transaction_type, TransactionType::Transfer);

        assert!(order.stock_movement(5).is_none());
    }

    #[test]
    fn filter_matches_transfer_on_either_warehouse() {
        let from = WarehouseId::new();
        let to = WarehouseId::new();
        let doc = Document::create(
            new_doc(DocumentType::Transfer, WarehouseRef::Transfer { from, to }, Counterpart::None),
            UserId::new(),
            Utc::now(),
        )
        .unwrap();

        let by_dest = DocumentFilter {
            warehouse_id: Some(to),
            ..DocumentFilter::default()
        };
        let by_status = DocumentFilter {
            status: Some("in_transit".to_string()),
            ..DocumentFilter::default()
        };
        assert!(by_dest.matches(&doc));
        assert!(!by_status.matches(&doc));
    }
}
