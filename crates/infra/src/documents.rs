//! DocumentService: creation, lookup and status lifecycle of documents.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use wareflow_core::{DocumentId, DomainError, UserId};
use wareflow_documents::{
    Document, DocumentFilter, DocumentLineItem, DocumentStatus, NewDocument,
};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{DocumentStore, LineItemStore, StoreError, Stores};

#[derive(Clone)]
pub struct DocumentService {
    documents: Arc<dyn DocumentStore>,
    line_items: Arc<dyn LineItemStore>,
}

impl DocumentService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            documents: stores.documents.clone(),
            line_items: stores.line_items.clone(),
        }
    }

    #[instrument(skip(self, new), fields(doc_type = %new.doc_type), err)]
    pub async fn create_document(&self, new: NewDocument, actor: UserId) -> ServiceResult<Document> {
        let doc = Document::create(new, actor, Utc::now())?;
        self.documents.insert(&doc).await?;
        info!(document_id = %doc.id, "document created");
        Ok(doc)
    }

    pub async fn get_document(&self, id: DocumentId) -> ServiceResult<Document> {
        self.documents
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("document", id))
    }

    pub async fn list_documents(&self, filter: &DocumentFilter) -> ServiceResult<Vec<Document>> {
        Ok(self.documents.list(filter).await?)
    }

    pub async fn line_items(&self, id: DocumentId) -> ServiceResult<Vec<DocumentLineItem>> {
        self.get_document(id).await?;
        Ok(self.line_items.list_by_document(id).await?)
    }

    /// Move a document to status `to` (a status name of the document's type).
    ///
    /// The edge is checked against the lifecycle table, then written with a
    /// compare-and-set on the current status; losing that race is a `Conflict`.
    #[instrument(skip(self), err)]
    pub async fn change_status(&self, id: DocumentId, to: &str, actor: UserId) -> ServiceResult<Document> {
        let mut doc = self.get_document(id).await?;
        let next = DocumentStatus::parse(doc.doc_type, to)
            .map_err(|_| DomainError::invalid_transition(doc.status, to))?;
        let next = doc.status.transition(next)?;

        let now = Utc::now();
        self.documents
            .compare_and_set_status(id, doc.status, next, now)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(msg) => ServiceError::Domain(DomainError::conflict(msg)),
                StoreError::NotFound(_) => ServiceError::not_found("document", id),
                other => ServiceError::Store(other),
            })?;

        info!(from = %doc.status, to = %next, "document status changed");
        doc.status = next;
        doc.updated_at = now;
        Ok(doc)
    }
}
