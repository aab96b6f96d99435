//! DocItemCoordinator: line-item mutations kept in lockstep with stock and the
//! transaction log.
//!
//! Each mutation runs as a saga (line item write, stock adjustment, log
//! append) so a failure at any step leaves stock, lines and the log as they
//! were. Document totals are recalculated after every successful mutation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use wareflow_core::{DomainError, LineItemId, UserId};
use wareflow_documents::{
    Batch, Document, DocumentLineItem, DocumentType, LineItemPatch, NewLineItem, StockMovement,
};
use wareflow_inventory::{StockDelta, StockKey, TransactionLogEntry, TransactionType};

use crate::error::{ServiceError, ServiceResult};
use crate::ledger::InventoryLedger;
use crate::recalculator::DocSumRecalculator;
use crate::saga::{
    AdjustStock, AppendLog, DeleteLineItem, InsertBatch, InsertLineItem, Saga, UpdateLineItem,
};
use crate::store::{BatchStore, DocumentStore, LineItemStore, Stores, TransactionLogStore};

#[derive(Clone)]
pub struct DocItemCoordinator {
    documents: Arc<dyn DocumentStore>,
    line_items: Arc<dyn LineItemStore>,
    batches: Arc<dyn BatchStore>,
    transactions: Arc<dyn TransactionLogStore>,
    ledger: InventoryLedger,
    recalculator: DocSumRecalculator,
}

impl DocItemCoordinator {
    pub fn new(stores: &Stores) -> Self {
        Self {
            documents: stores.documents.clone(),
            line_items: stores.line_items.clone(),
            batches: stores.batches.clone(),
            transactions: stores.transactions.clone(),
            ledger: InventoryLedger::new(stores),
            recalculator: DocSumRecalculator::new(stores),
        }
    }

    async fn load_document(&self, line: &DocumentLineItem) -> ServiceResult<Document> {
        self.documents
            .get(line.document_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("document", line.document_id))
    }

    async fn load_line(&self, id: LineItemId) -> ServiceResult<DocumentLineItem> {
        self.line_items
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("line item", id))
    }

    /// Stock adjustment plus its log entry, appended to `saga`.
    fn with_movement(
        &self,
        saga: Saga,
        movement: StockMovement,
        transaction_type: TransactionType,
        line: &DocumentLineItem,
        actor: UserId,
    ) -> Saga {
        let key = StockKey::new(line.product_id, line.batch_id, movement.warehouse_id);
        let adjust = AdjustStock::new(self.ledger.clone(), key, StockDelta::adjustment(movement.delta));
        let entry = TransactionLogEntry::new(transaction_type, key, movement.delta, 0, actor, Utc::now())
            .for_document(line.document_id, Some(line.id));
        let log = AppendLog::new(self.transactions.clone(), entry).after(&adjust);
        saga.step(adjust).step(log)
    }

    /// Add a line to a document and move the matching stock.
    #[instrument(
        skip(self, req),
        fields(document_id = %req.document_id, product_id = %req.product_id, quantity = req.quantity),
        err
    )]
    pub async fn add_item(&self, req: NewLineItem, actor: UserId) -> ServiceResult<DocumentLineItem> {
        let doc = self
            .documents
            .get(req.document_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("document", req.document_id))?;
        req.validate()?;
        doc.ensure_lines_editable()?;

        if req.new_batch.is_some() && doc.doc_type != DocumentType::Incoming {
            return Err(DomainError::validation("newBatch is only accepted on incoming documents").into());
        }
        if let Some(batch_id) = req.batch_id {
            let batch = self
                .batches
                .get(batch_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("batch", batch_id))?;
            if batch.product_id != req.product_id {
                return Err(DomainError::validation(format!(
                    "batch {batch_id} does not belong to product {}",
                    req.product_id
                ))
                .into());
            }
        }

        let movement = doc.stock_movement(req.quantity);
        if doc.doc_type == DocumentType::Outgoing {
            if let Some(m) = movement {
                let key = StockKey::new(req.product_id, req.batch_id, m.warehouse_id);
                self.ledger.ensure_free(&key, req.quantity).await?;
            }
        }

        let now = Utc::now();
        let new_batch = req
            .new_batch
            .as_ref()
            .map(|nb| Batch::receive(req.product_id, req.quantity, nb, now));
        let batch_id = new_batch.as_ref().map(|b| b.id).or(req.batch_id);
        let line = DocumentLineItem::from_request(&req, batch_id, actor, now)?;
        self.recalculator.preview(&line).await?;

        let mut saga = Saga::new("add_item");
        if let Some(batch) = new_batch {
            saga = saga.step(InsertBatch::new(self.batches.clone(), batch));
        }
        saga = saga.step(InsertLineItem::new(self.line_items.clone(), line.clone()));
        if let Some(m) = movement {
            saga = self.with_movement(saga, m, m.transaction_type, &line, actor);
        }
        saga.run().await?;

        self.recalculator.recalculate(doc.id).await?;
        info!(line_item_id = %line.id, "line item added");
        Ok(line)
    }

    /// Remove a line, reversing its stock effect unless the document is canceled.
    ///
    /// Reversals are logged as `Adjustment` whatever the document type. The
    /// line's batch is deleted once no line references it.
    #[instrument(skip(self), err)]
    pub async fn remove_item(&self, line_item_id: LineItemId, actor: UserId) -> ServiceResult<()> {
        let line = self.load_line(line_item_id).await?;
        let doc = self.load_document(&line).await?;

        let mut saga = Saga::new("remove_item").step(DeleteLineItem::new(self.line_items.clone(), line.clone()));
        if !doc.status.is_canceled() {
            if let Some(m) = doc.stock_movement(line.quantity) {
                let reversal = StockMovement {
                    delta: -m.delta,
                    ..m
                };
                saga = self.with_movement(saga, reversal, TransactionType::Adjustment, &line, actor);
            }
        }
        saga.run().await?;

        if let Some(batch_id) = line.batch_id {
            if self.line_items.count_by_batch(batch_id).await? == 0 {
                self.batches.delete(batch_id).await?;
                info!(batch_id = %batch_id, "orphaned batch deleted");
            }
        }

        self.recalculator.recalculate(doc.id).await?;
        info!(line_item_id = %line.id, "line item removed");
        Ok(())
    }

    /// Change quantity, price or bonus of a line. Stock moves by the signed
    /// quantity difference.
    #[instrument(skip(self, patch), err)]
    pub async fn update_item(
        &self,
        line_item_id: LineItemId,
        patch: LineItemPatch,
        actor: UserId,
    ) -> ServiceResult<DocumentLineItem> {
        let line = self.load_line(line_item_id).await?;
        let doc = self.load_document(&line).await?;
        doc.ensure_lines_editable()?;
        if patch.is_empty() {
            return Ok(line);
        }
        let next = line.patched(&patch)?;
        self.recalculator.preview(&next).await?;

        let diff = next.quantity - line.quantity;
        let movement = doc.stock_movement(diff);
        if doc.doc_type == DocumentType::Outgoing && diff > 0 {
            if let Some(m) = movement {
                let key = StockKey::new(line.product_id, line.batch_id, m.warehouse_id);
                self.ledger.ensure_free(&key, diff).await?;
            }
        }

        let mut saga = Saga::new("update_item").step(UpdateLineItem::new(
            self.line_items.clone(),
            line.clone(),
            next.clone(),
        ));
        if let Some(m) = movement {
            saga = self.with_movement(saga, m, TransactionType::Adjustment, &next, actor);
        }
        saga.run().await?;

        self.recalculator.recalculate(doc.id).await?;
        info!(line_item_id = %next.id, quantity_diff = diff, "line item updated");
        Ok(next)
    }
}
