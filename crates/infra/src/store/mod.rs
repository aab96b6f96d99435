//! Storage abstractions for documents, stock, the transaction log and deliveries.
//!
//! Every trait has an in-memory implementation (tests/dev) and a Postgres one.
//! Services only see `Stores`, a bundle of trait objects injected at startup.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use wareflow_core::{
    AddressId, BatchId, CustomerId, DeliveryId, DocumentId, LineItemId, ProductId, UserId,
    WarehouseId,
};
use wareflow_delivery::{Address, Customer, DeliveryDocument, DeliveryItem};
use wareflow_documents::{
    Batch, DocTotals, Document, DocumentFilter, DocumentLineItem, DocumentStatus,
};
use wareflow_inventory::{InventoryRecord, StockDelta, StockKey, TransactionLogEntry};

pub use in_memory::{
    InMemoryAddressStore, InMemoryBatchStore, InMemoryCustomerStore, InMemoryDeliveryStore,
    InMemoryDocumentStore, InMemoryInventoryStore, InMemoryLineItemStore,
    InMemoryTransactionLogStore,
};
pub use postgres::{
    PgAddressStore, PgBatchStore, PgCustomerStore, PgDeliveryStore, PgDocumentStore,
    PgInventoryStore, PgLineItemStore, PgTransactionLogStore, apply_schema,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// Duplicate key or lost compare-and-set.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A guarded update would have taken a quantity below zero.
    #[error("bound violation: {0}")]
    BoundViolation(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: DocumentId) -> StoreResult<Option<Document>>;
    async fn insert(&self, doc: &Document) -> StoreResult<()>;
    async fn list(&self, filter: &DocumentFilter) -> StoreResult<Vec<Document>>;
    /// Set `next` only if the stored status still equals `expected`.
    ///
    /// Returns `Conflict` when another writer changed the status first.
    async fn compare_and_set_status(
        &self,
        id: DocumentId,
        expected: DocumentStatus,
        next: DocumentStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;
    async fn set_totals(&self, id: DocumentId, totals: DocTotals, at: DateTime<Utc>) -> StoreResult<()>;
    async fn delete(&self, id: DocumentId) -> StoreResult<()>;
}

#[async_trait]
pub trait LineItemStore: Send + Sync {
    async fn get(&self, id: LineItemId) -> StoreResult<Option<DocumentLineItem>>;
    async fn insert(&self, item: &DocumentLineItem) -> StoreResult<()>;
    /// Replace `expected` with `next`. Fails with `Conflict` if the stored
    /// quantity, price or bonus no longer match `expected`.
    async fn compare_and_update(&self, expected: &DocumentLineItem, next: &DocumentLineItem) -> StoreResult<()>;
    /// Fails with `NotFound` if there was no row to delete.
    async fn delete(&self, id: LineItemId) -> StoreResult<()>;
    async fn list_by_document(&self, document_id: DocumentId) -> StoreResult<Vec<DocumentLineItem>>;
    async fn count_by_batch(&self, batch_id: BatchId) -> StoreResult<i64>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get(&self, key: &StockKey) -> StoreResult<Option<InventoryRecord>>;
    /// All batch records of a product in a warehouse.
    async fn list_for(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> StoreResult<Vec<InventoryRecord>>;
    /// Atomically add `delta`, creating the record on first use.
    ///
    /// Fails with `BoundViolation` (and changes nothing) if either quantity
    /// would go negative. Returns the record after the change.
    async fn try_apply(&self, key: &StockKey, delta: StockDelta) -> StoreResult<InventoryRecord>;
}

/// Append-only. Lookups return newest entries first.
#[async_trait]
pub trait TransactionLogStore: Send + Sync {
    async fn append(&self, entry: &TransactionLogEntry) -> StoreResult<()>;
    async fn find_by_product(&self, product_id: ProductId) -> StoreResult<Vec<TransactionLogEntry>>;
    async fn find_by_batch(&self, batch_id: BatchId) -> StoreResult<Vec<TransactionLogEntry>>;
    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Vec<TransactionLogEntry>>;
}

#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn get(&self, id: BatchId) -> StoreResult<Option<Batch>>;
    async fn insert(&self, batch: &Batch) -> StoreResult<()>;
    async fn list_by_product(&self, product_id: ProductId) -> StoreResult<Vec<Batch>>;
    async fn delete(&self, id: BatchId) -> StoreResult<()>;
}

#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn insert_header(&self, delivery: &DeliveryDocument) -> StoreResult<()>;
    async fn insert_items(&self, items: &[DeliveryItem]) -> StoreResult<()>;
    async fn get(&self, id: DeliveryId) -> StoreResult<Option<DeliveryDocument>>;
    async fn items_for(&self, id: DeliveryId) -> StoreResult<Vec<DeliveryItem>>;
    /// Deliveries dated within `[start, end]`, ordered by date then start time.
    async fn list_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<DeliveryDocument>>;
    async fn update_header(&self, delivery: &DeliveryDocument) -> StoreResult<()>;
    async fn update_item(&self, item: &DeliveryItem) -> StoreResult<()>;
    /// Remove the header and all of its items.
    async fn delete(&self, id: DeliveryId) -> StoreResult<()>;
}

#[async_trait]
pub trait AddressStore: Send + Sync {
    async fn find(&self, id: AddressId) -> StoreResult<Option<Address>>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find(&self, id: CustomerId) -> StoreResult<Option<Customer>>;
}

/// Injected storage handles shared by all services.
#[derive(Clone)]
pub struct Stores {
    pub documents: Arc<dyn DocumentStore>,
    pub line_items: Arc<dyn LineItemStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub transactions: Arc<dyn TransactionLogStore>,
    pub batches: Arc<dyn BatchStore>,
    pub deliveries: Arc<dyn DeliveryStore>,
    pub addresses: Arc<dyn AddressStore>,
    pub customers: Arc<dyn CustomerStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            documents: Arc::new(InMemoryDocumentStore::new()),
            line_items: Arc::new(InMemoryLineItemStore::new()),
            inventory: Arc::new(InMemoryInventoryStore::new()),
            transactions: Arc::new(InMemoryTransactionLogStore::new()),
            batches: Arc::new(InMemoryBatchStore::new()),
            deliveries: Arc::new(InMemoryDeliveryStore::new()),
            addresses: Arc::new(InMemoryAddressStore::new()),
            customers: Arc::new(InMemoryCustomerStore::new()),
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            documents: Arc::new(PgDocumentStore::new(pool.clone())),
            line_items: Arc::new(PgLineItemStore::new(pool.clone())),
            inventory: Arc::new(PgInventoryStore::new(pool.clone())),
            transactions: Arc::new(PgTransactionLogStore::new(pool.clone())),
            batches: Arc::new(PgBatchStore::new(pool.clone())),
            deliveries: Arc::new(PgDeliveryStore::new(pool.clone())),
            addresses: Arc::new(PgAddressStore::new(pool.clone())),
            customers: Arc::new(PgCustomerStore::new(pool)),
        }
    }
}

