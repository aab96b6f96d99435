use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{
    BatchId, DocumentId, DomainError, DomainResult, Entity, LineItemId, Money, ProductId,
    Quantity, UserId,
};

/// Request to add a line to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLineItem {
    pub document_id: DocumentId,
    pub product_id: ProductId,
    #[serde(default)]
    pub batch_id: Option<BatchId>,
    /// Receive into a new batch (incoming documents only).
    #[serde(default)]
    pub new_batch: Option<NewBatch>,
    pub quantity: Quantity,
    pub unit_price: Money,
    #[serde(default)]
    pub bonus: Money,
}

impl NewLineItem {
    pub fn validate(&self) -> DomainResult<()> {
        validate_amounts(self.quantity, self.unit_price, self.bonus)?;
        if self.batch_id.is_some() && self.new_batch.is_some() {
            return Err(DomainError::validation(
                "batchId and newBatch are mutually exclusive",
            ));
        }
        Ok(())
    }
}

fn validate_amounts(quantity: Quantity, unit_price: Money, bonus: Money) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    if unit_price < 0 {
        return Err(DomainError::validation("unitPrice cannot be negative"));
    }
    if bonus < 0 || bonus > unit_price {
        return Err(DomainError::validation(
            "bonus must be between 0 and unitPrice",
        ));
    }
    if quantity.checked_mul(unit_price - bonus).is_none() {
        return Err(DomainError::validation("line total is out of range"));
    }
    Ok(())
}

/// One product/quantity/price entry of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLineItem {
    pub id: LineItemId,
    pub document_id: DocumentId,
    pub product_id: ProductId,
    pub batch_id: Option<BatchId>,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub bonus: Money,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
}

impl DocumentLineItem {
    /// Build a line from a validated request. The id is assigned up front so
    /// every later step can reference it.
    pub fn from_request(
        req: &NewLineItem,
        batch_id: Option<BatchId>,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        req.validate()?;
        Ok(Self {
            id: LineItemId::new(),
            document_id: req.document_id,
            product_id: req.product_id,
            batch_id,
            quantity: req.quantity,
            unit_price: req.unit_price,
            bonus: req.bonus,
            created_at: now,
            created_by,
        })
    }

    /// `quantity × (unit_price − bonus)`.
    pub fn line_total(&self) -> DomainResult<Money> {
        self.quantity
            .checked_mul(self.unit_price - self.bonus)
            .ok_or_else(|| DomainError::invariant(format!("line {} total overflows", self.id)))
    }

    /// Apply a patch, returning the updated copy.
    pub fn patched(&self, patch: &LineItemPatch) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(q) = patch.quantity {
            next.quantity = q;
        }
        if let Some(p) = patch.unit_price {
            next.unit_price = p;
        }
        if let Some(b) = patch.bonus {
            next.bonus = b;
        }
        validate_amounts(next.quantity, next.unit_price, next.bonus)?;
        Ok(next)
    }
}

impl Entity for DocumentLineItem {
    type Id = LineItemId;

    fn id(&self) -> LineItemId {
        self.id
    }
}

/// Partial update of a line item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemPatch {
    pub quantity: Option<Quantity>,
    pub unit_price: Option<Money>,
    pub bonus: Option<Money>,
}

impl LineItemPatch {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.unit_price.is_none() && self.bonus.is_none()
    }
}

/// Inline batch data carried by an incoming line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBatch {
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
}

/// Receipt lot of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: BatchId,
    pub product_id: ProductId,
    pub quantity_received: Quantity,
    pub expires_on: Option<NaiveDate>,
    pub received_at: DateTime<Utc>,
}

impl Batch {
    pub fn receive(
        product_id: ProductId,
        quantity_received: Quantity,
        new: &NewBatch,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BatchId::new(),
            product_id,
            quantity_received,
            expires_on: new.expires_on,
            received_at: now,
        }
    }
}

impl Entity for Batch {
    type Id = BatchId;

    fn id(&self) -> BatchId {
        self.id
    }
}
