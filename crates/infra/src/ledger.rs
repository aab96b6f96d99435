//! InventoryLedger: stock queries, reservations and atomic adjustments.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use wareflow_core::{DomainError, ProductId, Quantity, UserId, WarehouseId};
use wareflow_inventory::{
    InventoryRecord, ReservationRequest, StockDelta, StockKey, TransactionLogEntry,
    TransactionType, check_reservation,
};

use crate::error::{ServiceError, ServiceResult};
use crate::saga::{AdjustStock, AppendLog, Saga};
use crate::store::{InventoryStore, Stores, TransactionLogStore};

/// Stock of one product in one warehouse, summed over batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub available: Quantity,
    pub reserved: Quantity,
    pub records: Vec<InventoryRecord>,
}

#[derive(Clone)]
pub struct InventoryLedger {
    inventory: Arc<dyn InventoryStore>,
    transactions: Arc<dyn TransactionLogStore>,
}

impl InventoryLedger {
    pub fn new(stores: &Stores) -> Self {
        Self {
            inventory: stores.inventory.clone(),
            transactions: stores.transactions.clone(),
        }
    }

    pub async fn stock_level(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> ServiceResult<StockLevel> {
        let mut records = self.inventory.list_for(product_id, warehouse_id).await?;
        records.sort_by_key(|r| r.key.batch_id);
        let (available, reserved) = records.iter().fold((0, 0), |(a, r), rec| {
            (a + rec.quantity_available, r + rec.quantity_reserved)
        });
        Ok(StockLevel {
            product_id,
            warehouse_id,
            available,
            reserved,
            records,
        })
    }

    /// Available quantity over all batches; 0 when no record exists.
    pub async fn get_available(&self, product_id: ProductId, warehouse_id: WarehouseId) -> ServiceResult<Quantity> {
        Ok(self.stock_level(product_id, warehouse_id).await?.available)
    }

    /// Reserved quantity over all batches; 0 when no record exists.
    pub async fn get_reserved(&self, product_id: ProductId, warehouse_id: WarehouseId) -> ServiceResult<Quantity> {
        Ok(self.stock_level(product_id, warehouse_id).await?.reserved)
    }

    /// Batch-precise record lookup.
    pub async fn record(&self, key: &StockKey) -> ServiceResult<Option<InventoryRecord>> {
        Ok(self.inventory.get(key).await?)
    }

    /// Advisory free-stock check for `key`. The atomic update stays authoritative.
    pub async fn ensure_free(&self, key: &StockKey, requested: Quantity) -> ServiceResult<()> {
        let record = self.inventory.get(key).await?;
        check_reservation(record.as_ref(), key.product_id, requested)?;
        Ok(())
    }

    /// Apply a delta atomically. Any rejection is an `InventoryUpdate` error.
    pub async fn apply(&self, key: &StockKey, delta: StockDelta) -> ServiceResult<InventoryRecord> {
        self.inventory
            .try_apply(key, delta)
            .await
            .map_err(|e| ServiceError::InventoryUpdate(e.to_string()))
    }

    /// Add a signed `delta` to the available quantity, creating the record if needed.
    pub async fn adjust(&self, key: &StockKey, delta: Quantity) -> ServiceResult<InventoryRecord> {
        self.apply(key, StockDelta::adjustment(delta)).await
    }

    /// Reserve each item independently.
    ///
    /// Items before a failing one stay reserved. Every reservation is logged as a
    /// `Reservation` transaction.
    #[instrument(skip(self, items), fields(items = items.len()), err)]
    pub async fn reserve(
        &self,
        items: &[ReservationRequest],
        warehouse_id: WarehouseId,
        actor: UserId,
    ) -> ServiceResult<Vec<InventoryRecord>> {
        let mut reserved = Vec::with_capacity(items.len());
        for item in items {
            let key = StockKey::new(item.product_id, item.batch_id, warehouse_id);
            self.ensure_free(&key, item.quantity).await?;

            let adjust = AdjustStock::new(self.clone(), key, StockDelta::reservation(item.quantity));
            let entry = TransactionLogEntry::new(
                TransactionType::Reservation,
                key,
                -item.quantity,
                0,
                actor,
                Utc::now(),
            );
            let log = AppendLog::new(self.transactions.clone(), entry).after(&adjust);

            match Saga::new("reserve").step(adjust).step(log).run().await {
                Ok(()) => {}
                Err(ServiceError::InventoryUpdate(_)) => {
                    // Lost a race after the advisory check.
                    let free = self
                        .inventory
                        .get(&key)
                        .await?
                        .map(|r| r.free())
                        .unwrap_or(0);
                    return Err(DomainError::InsufficientStock {
                        product_id: item.product_id,
                        free,
                        requested: item.quantity,
                    }
                    .into());
                }
                Err(e) => return Err(e),
            }

            info!(key = %key, quantity = item.quantity, "stock reserved");
            if let Some(record) = self.inventory.get(&key).await? {
                reserved.push(record);
            }
        }
        Ok(reserved)
    }
}
