use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{
    BatchId, DocumentId, Entity, LineItemId, ProductId, Quantity, TransactionId, UserId,
    WarehouseId,
};

use crate::record::StockKey;

/// Kind of movement recorded in the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Incoming,
    Outgoing,
    Transfer,
    Reservation,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Incoming => "incoming",
            TransactionType::Outgoing => "outgoing",
            TransactionType::Transfer => "transfer",
            TransactionType::Reservation => "reservation",
            TransactionType::Adjustment => "adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "incoming" => Some(TransactionType::Incoming),
            "outgoing" => Some(TransactionType::Outgoing),
            "transfer" => Some(TransactionType::Transfer),
            "reservation" => Some(TransactionType::Reservation),
            "adjustment" => Some(TransactionType::Adjustment),
            _ => None,
        }
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit row describing one quantity change.
///
/// Fields are public for reads and storage mapping; nothing in the crate offers a
/// way to modify an entry once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionLogEntry {
    pub id: TransactionId,
    pub transaction_type: TransactionType,
    pub product_id: ProductId,
    pub batch_id: Option<BatchId>,
    pub warehouse_id: WarehouseId,
    /// Signed change of the available quantity.
    pub quantity_change: Quantity,
    /// Available quantity right before the change.
    pub quantity_before: Quantity,
    pub occurred_at: DateTime<Utc>,
    pub user_id: UserId,
    pub document_id: Option<DocumentId>,
    pub line_item_id: Option<LineItemId>,
}

impl TransactionLogEntry {
    pub fn new(
        transaction_type: TransactionType,
        key: StockKey,
        quantity_change: Quantity,
        quantity_before: Quantity,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            transaction_type,
            product_id: key.product_id,
            batch_id: key.batch_id,
            warehouse_id: key.warehouse_id,
            quantity_change,
            quantity_before,
            occurred_at,
            user_id,
            document_id: None,
            line_item_id: None,
        }
    }

    pub fn for_document(mut self, document_id: DocumentId, line_item_id: Option<LineItemId>) -> Self {
        self.document_id = Some(document_id);
        self.line_item_id = line_item_id;
        self
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.product_id, self.batch_id, self.warehouse_id)
    }
}

impl Entity for TransactionLogEntry {
    type Id = TransactionId;

    fn id(&self) -> TransactionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_round_trip() {
        for t in [
            TransactionType::Incoming,
            TransactionType::Outgoing,
            TransactionType::Transfer,
            TransactionType::Reservation,
            TransactionType::Adjustment,
        ] {
            assert_eq!(TransactionType::parse(t.as_str()), Some(t));
        }
        assert_eq!(TransactionType::parse("sale"), None);
    }

    #[test]
    fn for_document_keeps_key_fields() {
        let key = StockKey::new(ProductId::new(), Some(BatchId::new()), WarehouseId::new());
        let doc = DocumentId::new();
        let line = LineItemId::new();
        let entry = TransactionLogEntry::new(
            TransactionType::Outgoing,
            key,
            -4,
            10,
            UserId::new(),
            Utc::now(),
        )
        .for_document(doc, Some(line));

        assert_eq!(entry.key(), key);
        assert_eq!(entry.document_id, Some(doc));
        assert_eq!(entry.line_item_id, Some(line));
    }
}
