//! Saga steps shared by the document and delivery services.
//!
//! Ids are assigned before a saga starts, so each step carries everything it
//! needs and compensation can address the exact rows it wrote.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::debug;

use wareflow_core::Quantity;
use wareflow_delivery::{DeliveryDocument, DeliveryItem};
use wareflow_documents::{Batch, DocumentLineItem};
use wareflow_inventory::{StockDelta, StockKey, TransactionLogEntry};

use super::SagaStep;
use crate::error::{ServiceError, ServiceResult};
use crate::ledger::InventoryLedger;
use crate::store::{BatchStore, DeliveryStore, LineItemStore, TransactionLogStore};

pub struct InsertBatch {
    batches: Arc<dyn BatchStore>,
    batch: Batch,
}

impl InsertBatch {
    pub fn new(batches: Arc<dyn BatchStore>, batch: Batch) -> Self {
        Self { batches, batch }
    }
}

#[async_trait]
impl SagaStep for InsertBatch {
    fn name(&self) -> &'static str {
        "insert_batch"
    }

    async fn apply(&self) -> ServiceResult<()> {
        Ok(self.batches.insert(&self.batch).await?)
    }

    async fn compensate(&self) -> ServiceResult<()> {
        Ok(self.batches.delete(self.batch.id).await?)
    }
}

pub struct InsertLineItem {
    line_items: Arc<dyn LineItemStore>,
    item: DocumentLineItem,
}

impl InsertLineItem {
    pub fn new(line_items: Arc<dyn LineItemStore>, item: DocumentLineItem) -> Self {
        Self { line_items, item }
    }
}

#[async_trait]
impl SagaStep for InsertLineItem {
    fn name(&self) -> &'static str {
        "insert_line_item"
    }

    async fn apply(&self) -> ServiceResult<()> {
        Ok(self.line_items.insert(&self.item).await?)
    }

    async fn compensate(&self) -> ServiceResult<()> {
        Ok(self.line_items.delete(self.item.id).await?)
    }
}

/// Delete a line item; compensation inserts it again with the same id.
///
/// Fails with `NotFound` if another removal got there first.
pub struct DeleteLineItem {
    line_items: Arc<dyn LineItemStore>,
    item: DocumentLineItem,
}

impl DeleteLineItem {
    pub fn new(line_items: Arc<dyn LineItemStore>, item: DocumentLineItem) -> Self {
        Self { line_items, item }
    }
}

#[async_trait]
impl SagaStep for DeleteLineItem {
    fn name(&self) -> &'static str {
        "delete_line_item"
    }

    async fn apply(&self) -> ServiceResult<()> {
        Ok(self.line_items.delete(self.item.id).await?)
    }

    async fn compensate(&self) -> ServiceResult<()> {
        Ok(self.line_items.insert(&self.item).await?)
    }
}

/// Compare-and-set a line item; compensation writes the previous version back.
pub struct UpdateLineItem {
    line_items: Arc<dyn LineItemStore>,
    previous: DocumentLineItem,
    next: DocumentLineItem,
}

impl UpdateLineItem {
    pub fn new(
        line_items: Arc<dyn LineItemStore>,
        previous: DocumentLineItem,
        next: DocumentLineItem,
    ) -> Self {
        Self {
            line_items,
            previous,
            next,
        }
    }
}

#[async_trait]
impl SagaStep for UpdateLineItem {
    fn name(&self) -> &'static str {
        "update_line_item"
    }

    async fn apply(&self) -> ServiceResult<()> {
        Ok(self.line_items.compare_and_update(&self.previous, &self.next).await?)
    }

    async fn compensate(&self) -> ServiceResult<()> {
        Ok(self.line_items.compare_and_update(&self.next, &self.previous).await?)
    }
}

/// Atomic stock adjustment. Compensation applies the inverse delta.
pub struct AdjustStock {
    ledger: InventoryLedger,
    key: StockKey,
    delta: StockDelta,
    before: Arc<OnceLock<Quantity>>,
}

impl AdjustStock {
    pub fn new(ledger: InventoryLedger, key: StockKey, delta: StockDelta) -> Self {
        Self {
            ledger,
            key,
            delta,
            before: Arc::new(OnceLock::new()),
        }
    }

    /// Available quantity right before this step applied (set on success).
    pub fn before(&self) -> Arc<OnceLock<Quantity>> {
        self.before.clone()
    }
}

#[async_trait]
impl SagaStep for AdjustStock {
    fn name(&self) -> &'static str {
        "adjust_stock"
    }

    async fn apply(&self) -> ServiceResult<()> {
        let after = self.ledger.apply(&self.key, self.delta).await?;
        let _ = self.before.set(after.quantity_available - self.delta.available);
        Ok(())
    }

    async fn compensate(&self) -> ServiceResult<()> {
        self.ledger.apply(&self.key, self.delta.inverse()).await?;
        Ok(())
    }
}

/// Append a transaction log entry.
///
/// Log entries are immutable, so there is nothing to compensate; this step is
/// always the last one of its saga.
pub struct AppendLog {
    log: Arc<dyn TransactionLogStore>,
    entry: TransactionLogEntry,
    before: Option<Arc<OnceLock<Quantity>>>,
}

impl AppendLog {
    pub fn new(log: Arc<dyn TransactionLogStore>, entry: TransactionLogEntry) -> Self {
        Self {
            log,
            entry,
            before: None,
        }
    }

    /// Take `quantity_before` from a preceding `AdjustStock`.
    pub fn after(mut self, adjust: &AdjustStock) -> Self {
        self.before = Some(adjust.before());
        self
    }
}

#[async_trait]
impl SagaStep for AppendLog {
    fn name(&self) -> &'static str {
        "append_log"
    }

    async fn apply(&self) -> ServiceResult<()> {
        let mut entry = self.entry.clone();
        if let Some(before) = self.before.as_ref().and_then(|b| b.get()) {
            entry.quantity_before = *before;
        }
        self.log
            .append(&entry)
            .await
            .map_err(|e| ServiceError::LogAppend(e.to_string()))
    }

    async fn compensate(&self) -> ServiceResult<()> {
        debug!(transaction_id = %self.entry.id, "log entries are immutable, nothing to undo");
        Ok(())
    }
}

pub struct InsertDeliveryHeader {
    deliveries: Arc<dyn DeliveryStore>,
    header: DeliveryDocument,
}

impl InsertDeliveryHeader {
    pub fn new(deliveries: Arc<dyn DeliveryStore>, header: DeliveryDocument) -> Self {
        Self { deliveries, header }
    }
}

#[async_trait]
impl SagaStep for InsertDeliveryHeader {
    fn name(&self) -> &'static str {
        "insert_delivery_header"
    }

    async fn apply(&self) -> ServiceResult<()> {
        Ok(self.deliveries.insert_header(&self.header).await?)
    }

    async fn compensate(&self) -> ServiceResult<()> {
        Ok(self.deliveries.delete(self.header.id).await?)
    }
}

/// Insert all stops of a delivery. Removing the header removes them too.
pub struct InsertDeliveryItems {
    deliveries: Arc<dyn DeliveryStore>,
    items: Vec<DeliveryItem>,
}

impl InsertDeliveryItems {
    pub fn new(deliveries: Arc<dyn DeliveryStore>, items: Vec<DeliveryItem>) -> Self {
        Self { deliveries, items }
    }
}

#[async_trait]
impl SagaStep for InsertDeliveryItems {
    fn name(&self) -> &'static str {
        "insert_delivery_items"
    }

    async fn apply(&self) -> ServiceResult<()> {
        Ok(self.deliveries.insert_items(&self.items).await?)
    }

    async fn compensate(&self) -> ServiceResult<()> {
        Ok(())
    }
}
