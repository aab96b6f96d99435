use serde::{Deserialize, Serialize};

use wareflow_core::{BatchId, DomainError, DomainResult, ProductId, Quantity, WarehouseId};

/// Compound key of an inventory record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockKey {
    pub product_id: ProductId,
    pub batch_id: Option<BatchId>,
    pub warehouse_id: WarehouseId,
}

impl StockKey {
    pub fn new(product_id: ProductId, batch_id: Option<BatchId>, warehouse_id: WarehouseId) -> Self {
        Self {
            product_id,
            batch_id,
            warehouse_id,
        }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.batch_id {
            Some(batch) => write!(f, "{}/{}@{}", self.product_id, batch, self.warehouse_id),
            None => write!(f, "{}@{}", self.product_id, self.warehouse_id),
        }
    }
}

/// Signed change applied to one record in a single atomic step.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDelta {
    pub available: Quantity,
    pub reserved: Quantity,
}

impl StockDelta {
    /// Plain adjustment of the available quantity.
    pub fn adjustment(delta: Quantity) -> Self {
        Self {
            available: delta,
            reserved: 0,
        }
    }

    /// Move `quantity` from available to reserved.
    pub fn reservation(quantity: Quantity) -> Self {
        Self {
            available: -quantity,
            reserved: quantity,
        }
    }

    pub fn inverse(self) -> Self {
        Self {
            available: -self.available,
            reserved: -self.reserved,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.available == 0 && self.reserved == 0
    }
}

/// Stock level for one (product, batch, warehouse).
///
/// Both quantities are never negative; `apply` is the only way to change them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub key: StockKey,
    pub quantity_available: Quantity,
    pub quantity_reserved: Quantity,
}

impl InventoryRecord {
    /// Record as it exists before its first adjustment (upsert base).
    pub fn empty(key: StockKey) -> Self {
        Self {
            key,
            quantity_available: 0,
            quantity_reserved: 0,
        }
    }

    /// Quantity that can still be promised.
    ///
    /// Reserving moves stock out of `quantity_available`, so reserved units are
    /// already excluded here.
    pub fn free(&self) -> Quantity {
        self.quantity_available
    }

    /// Apply a delta, rejecting any result with a negative quantity.
    pub fn apply(&self, delta: StockDelta) -> DomainResult<InventoryRecord> {
        let available = self
            .quantity_available
            .checked_add(delta.available)
            .ok_or_else(|| DomainError::invariant("quantity_available overflow"))?;
        let reserved = self
            .quantity_reserved
            .checked_add(delta.reserved)
            .ok_or_else(|| DomainError::invariant("quantity_reserved overflow"))?;

        if available < 0 {
            return Err(DomainError::invariant(format!(
                "quantity_available cannot go negative ({} + {})",
                self.quantity_available, delta.available
            )));
        }
        if reserved < 0 {
            return Err(DomainError::invariant(format!(
                "quantity_reserved cannot go negative ({} + {})",
                self.quantity_reserved, delta.reserved
            )));
        }

        Ok(InventoryRecord {
            key: self.key,
            quantity_available: available,
            quantity_reserved: reserved,
        })
    }
}

/// One line of a reservation request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub batch_id: Option<BatchId>,
    pub quantity: Quantity,
}

/// Advisory free-stock check shared by reservations and outgoing lines.
///
/// A missing record counts as zero stock.
pub fn check_reservation(
    record: Option<&InventoryRecord>,
    product_id: ProductId,
    requested: Quantity,
) -> DomainResult<()> {
    if requested <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    let free = record.map(InventoryRecord::free).unwrap_or(0);
    if free < requested {
        return Err(DomainError::InsufficientStock {
            product_id,
            free,
            requested,
        });
    }
    Ok(())
}
