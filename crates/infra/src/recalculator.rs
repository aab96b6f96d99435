//! DocSumRecalculator: keeps `Document.summ`/`item_count` in line with its lines.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use wareflow_core::{DocumentId, DomainError};
use wareflow_documents::{DocTotals, DocumentLineItem, compute_totals};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{DocumentStore, LineItemStore, Stores};

#[derive(Clone)]
pub struct DocSumRecalculator {
    documents: Arc<dyn DocumentStore>,
    line_items: Arc<dyn LineItemStore>,
}

impl DocSumRecalculator {
    pub fn new(stores: &Stores) -> Self {
        Self {
            documents: stores.documents.clone(),
            line_items: stores.line_items.clone(),
        }
    }

    /// Recompute and store the document totals. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn recalculate(&self, document_id: DocumentId) -> ServiceResult<DocTotals> {
        let lines = self.line_items.list_by_document(document_id).await?;
        let totals = compute_totals(&lines)?;
        self.documents.set_totals(document_id, totals, Utc::now()).await?;
        debug!(summ = totals.summ, item_count = totals.item_count, "document totals updated");
        Ok(totals)
    }

    /// Totals the document would have with `candidate` added, or replacing the
    /// stored line with the same id. Nothing is written.
    ///
    /// Fails with `Validation` if the totals would leave the `i64` range.
    pub async fn preview(&self, candidate: &DocumentLineItem) -> ServiceResult<DocTotals> {
        let mut lines = self.line_items.list_by_document(candidate.document_id).await?;
        match lines.iter_mut().find(|l| l.id == candidate.id) {
            Some(slot) => *slot = candidate.clone(),
            None => lines.push(candidate.clone()),
        }
        compute_totals(&lines).map_err(|_| {
            ServiceError::from(DomainError::validation(format!(
                "document {} total would be out of range",
                candidate.document_id
            )))
        })
    }
}
