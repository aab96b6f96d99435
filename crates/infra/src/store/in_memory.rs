//! In-memory stores for tests/dev. Not optimized for performance.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use wareflow_core::{
    AddressId, BatchId, CustomerId, DeliveryId, DocumentId, Entity, LineItemId, ProductId, UserId,
    WarehouseId,
};
use wareflow_delivery::{Address, Customer, DeliveryDocument, DeliveryItem};
use wareflow_documents::{
    Batch, DocTotals, Document, DocumentFilter, DocumentLineItem, DocumentStatus,
};
use wareflow_inventory::{InventoryRecord, StockDelta, StockKey, TransactionLogEntry};

use super::{
    AddressStore, BatchStore, CustomerStore, DeliveryStore, DocumentStore, InventoryStore,
    LineItemStore, StoreError, StoreResult, TransactionLogStore,
};

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

/// Entity table keyed by `Entity::id`.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: RwLock<HashMap<E::Id, E>>,
}

impl<E: Entity + Clone> Table<E> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<E::Id, E>>> {
        self.rows.read().map_err(poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<E::Id, E>>> {
        self.rows.write().map_err(poisoned)
    }

    fn get(&self, id: E::Id) -> StoreResult<Option<E>> {
        Ok(self.read()?.get(&id).cloned())
    }

    fn insert(&self, row: E) -> StoreResult<()> {
        let mut rows = self.write()?;
        let id = row.id();
        if rows.contains_key(&id) {
            return Err(StoreError::Conflict(format!("duplicate id {id}")));
        }
        rows.insert(id, row);
        Ok(())
    }

    fn update(&self, row: E) -> StoreResult<()> {
        let mut rows = self.write()?;
        let id = row.id();
        match rows.get_mut(&id) {
            Some(slot) => {
                *slot = row;
                Ok(())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn swap(&self, expected: &E, row: E) -> StoreResult<()>
    where
        E: PartialEq,
    {
        let mut rows = self.write()?;
        let id = row.id();
        match rows.get_mut(&id) {
            Some(slot) if slot == expected => {
                *slot = row;
                Ok(())
            }
            Some(_) => Err(StoreError::Conflict(format!("{id} changed concurrently"))),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn remove(&self, id: E::Id) -> StoreResult<Option<E>> {
        Ok(self.write()?.remove(&id))
    }

    fn filter(&self, pred: impl Fn(&E) -> bool) -> StoreResult<Vec<E>> {
        Ok(self.read()?.values().filter(|r| pred(*r)).cloned().collect())
    }
}

impl<E: Entity + Clone> Default for Table<E> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! in_memory_store {
    ($(#[$meta:meta])* $name:ident, $entity:ty) => {
        $(#[$meta])*
        #[derive(Debug, Default)]
        pub struct $name {
            table: Table<$entity>,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }
        }
    };
}

in_memory_store!(InMemoryDocumentStore, Document);
in_memory_store!(InMemoryLineItemStore, DocumentLineItem);
in_memory_store!(InMemoryBatchStore, Batch);
in_memory_store!(
    /// Seedable address lookup.
    InMemoryAddressStore,
    Address
);
in_memory_store!(
    /// Seedable customer lookup.
    InMemoryCustomerStore,
    Customer
);

impl InMemoryAddressStore {
    pub fn seed(&self, address: Address) -> StoreResult<()> {
        self.table.insert(address)
    }
}

impl InMemoryCustomerStore {
    pub fn seed(&self, customer: Customer) -> StoreResult<()> {
        self.table.insert(customer)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, id: DocumentId) -> StoreResult<Option<Document>> {
        self.table.get(id)
    }

    async fn insert(&self, doc: &Document) -> StoreResult<()> {
        self.table.insert(doc.clone())
    }

    async fn list(&self, filter: &DocumentFilter) -> StoreResult<Vec<Document>> {
        let mut docs = self.table.filter(|d| filter.matches(d))?;
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(docs)
    }

    async fn compare_and_set_status(
        &self,
        id: DocumentId,
        expected: DocumentStatus,
        next: DocumentStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut rows = self.table.write()?;
        let doc = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if doc.status != expected {
            return Err(StoreError::Conflict(format!(
                "document {id} status is {}, expected {expected}",
                doc.status
            )));
        }
        doc.status = next;
        doc.updated_at = at;
        Ok(())
    }

    async fn set_totals(&self, id: DocumentId, totals: DocTotals, at: DateTime<Utc>) -> StoreResult<()> {
        let mut rows = self.table.write()?;
        let doc = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        doc.summ = totals.summ;
        doc.item_count = totals.item_count;
        doc.updated_at = at;
        Ok(())
    }

    async fn delete(&self, id: DocumentId) -> StoreResult<()> {
        self.table.remove(id).map(|_| ())
    }
}

#[async_trait]
impl LineItemStore for InMemoryLineItemStore {
    async fn get(&self, id: LineItemId) -> StoreResult<Option<DocumentLineItem>> {
        self.table.get(id)
    }

    async fn insert(&self, item: &DocumentLineItem) -> StoreResult<()> {
        self.table.insert(item.clone())
    }

    async fn compare_and_update(&self, expected: &DocumentLineItem, next: &DocumentLineItem) -> StoreResult<()> {
        self.table.swap(expected, next.clone())
    }

    async fn delete(&self, id: LineItemId) -> StoreResult<()> {
        self.table
            .remove(id)?
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_by_document(&self, document_id: DocumentId) -> StoreResult<Vec<DocumentLineItem>> {
        let mut items = self.table.filter(|i| i.document_id == document_id)?;
        items.sort_by_key(|i| (i.created_at, i.id));
        Ok(items)
    }

    async fn count_by_batch(&self, batch_id: BatchId) -> StoreResult<i64> {
        let rows = self.table.read()?;
        Ok(rows.values().filter(|i| i.batch_id == Some(batch_id)).count() as i64)
    }
}

#[async_trait]
impl BatchStore for InMemoryBatchStore {
    async fn get(&self, id: BatchId) -> StoreResult<Option<Batch>> {
        self.table.get(id)
    }

    async fn insert(&self, batch: &Batch) -> StoreResult<()> {
        self.table.insert(batch.clone())
    }

    async fn list_by_product(&self, product_id: ProductId) -> StoreResult<Vec<Batch>> {
        let mut batches = self.table.filter(|b| b.product_id == product_id)?;
        batches.sort_by_key(|b| (b.received_at, b.id));
        Ok(batches)
    }

    async fn delete(&self, id: BatchId) -> StoreResult<()> {
        self.table.remove(id).map(|_| ())
    }
}

#[async_trait]
impl AddressStore for InMemoryAddressStore {
    async fn find(&self, id: AddressId) -> StoreResult<Option<Address>> {
        self.table.get(id)
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn find(&self, id: CustomerId) -> StoreResult<Option<Customer>> {
        self.table.get(id)
    }
}

/// Stock records guarded by a single lock; `try_apply` is check-and-write
/// under one write guard.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    records: RwLock<HashMap<StockKey, InventoryRecord>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get(&self, key: &StockKey) -> StoreResult<Option<InventoryRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(key).cloned())
    }

    async fn list_for(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> StoreResult<Vec<InventoryRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .values()
            .filter(|r| r.key.product_id == product_id && r.key.warehouse_id == warehouse_id)
            .cloned()
            .collect())
    }

    async fn try_apply(&self, key: &StockKey, delta: StockDelta) -> StoreResult<InventoryRecord> {
        let mut records = self.records.write().map_err(poisoned)?;
        let current = records
            .get(key)
            .cloned()
            .unwrap_or_else(|| InventoryRecord::empty(*key));
        let next = current
            .apply(delta)
            .map_err(|e| StoreError::BoundViolation(format!("{key}: {e}")))?;
        records.insert(*key, next.clone());
        Ok(next)
    }
}

/// Append-only log held in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryTransactionLogStore {
    entries: RwLock<Vec<TransactionLogEntry>>,
}

impl InMemoryTransactionLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, pred: impl Fn(&TransactionLogEntry) -> bool) -> StoreResult<Vec<TransactionLogEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        let mut found: Vec<_> = entries.iter().filter(|e| pred(*e)).cloned().collect();
        found.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }
}

#[async_trait]
impl TransactionLogStore for InMemoryTransactionLogStore {
    async fn append(&self, entry: &TransactionLogEntry) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(StoreError::Conflict(format!("duplicate transaction {}", entry.id)));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn find_by_product(&self, product_id: ProductId) -> StoreResult<Vec<TransactionLogEntry>> {
        self.find(|e| e.product_id == product_id)
    }

    async fn find_by_batch(&self, batch_id: BatchId) -> StoreResult<Vec<TransactionLogEntry>> {
        self.find(|e| e.batch_id == Some(batch_id))
    }

    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Vec<TransactionLogEntry>> {
        self.find(|e| e.user_id == user_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDeliveryStore {
    headers: Table<DeliveryDocument>,
    items: Table<DeliveryItem>,
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn insert_header(&self, delivery: &DeliveryDocument) -> StoreResult<()> {
        self.headers.insert(delivery.clone())
    }

    async fn insert_items(&self, items: &[DeliveryItem]) -> StoreResult<()> {
        let mut rows = self.items.write()?;
        if let Some(dup) = items.iter().find(|i| rows.contains_key(&i.id)) {
            return Err(StoreError::Conflict(format!("duplicate delivery item {}", dup.id)));
        }
        for item in items {
            rows.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn get(&self, id: DeliveryId) -> StoreResult<Option<DeliveryDocument>> {
        self.headers.get(id)
    }

    async fn items_for(&self, id: DeliveryId) -> StoreResult<Vec<DeliveryItem>> {
        let mut items = self.items.filter(|i| i.delivery_id == id)?;
        items.sort_by_key(|i| (i.planned_time, i.id));
        Ok(items)
    }

    async fn list_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<DeliveryDocument>> {
        let mut found = self.headers.filter(|d| d.date >= start && d.date <= end)?;
        found.sort_by_key(|d| (d.date, d.start_time, d.id));
        Ok(found)
    }

    async fn update_header(&self, delivery: &DeliveryDocument) -> StoreResult<()> {
        self.headers.update(delivery.clone())
    }

    async fn update_item(&self, item: &DeliveryItem) -> StoreResult<()> {
        self.items.update(item.clone())
    }

    async fn delete(&self, id: DeliveryId) -> StoreResult<()> {
        self.headers.remove(id)?;
        self.items.write()?.retain(|_, i| i.delivery_id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> StockKey {
        StockKey::new(ProductId::new(), None, WarehouseId::new())
    }

    #[tokio::test]
    async fn try_apply_upserts_and_guards_bounds() {
        let store = InMemoryInventoryStore::new();
        let k = key();

        let rec = store.try_apply(&k, StockDelta::adjustment(10)).await.unwrap();
        assert_eq!(rec.quantity_available, 10);

        let err = store.try_apply(&k, StockDelta::adjustment(-11)).await.unwrap_err();
        assert!(matches!(err, StoreError::BoundViolation(_)));
        assert_eq!(store.get(&k).await.unwrap().unwrap().quantity_available, 10);
    }

    fn line() -> DocumentLineItem {
        DocumentLineItem {
            id: LineItemId::new(),
            document_id: DocumentId::new(),
            product_id: ProductId::new(),
            batch_id: None,
            quantity: 5,
            unit_price: 10,
            bonus: 0,
            created_at: Utc::now(),
            created_by: UserId::new(),
        }
    }

    #[tokio::test]
    async fn deleting_a_missing_line_is_not_found() {
        let store = InMemoryLineItemStore::new();
        let item = line();
        store.insert(&item).await.unwrap();

        store.delete(item.id).await.unwrap();
        let err = store.delete(item.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn stale_line_update_is_a_conflict() {
        let store = InMemoryLineItemStore::new();
        let item = line();
        store.insert(&item).await.unwrap();

        let eight = DocumentLineItem { quantity: 8, ..item.clone() };
        store.compare_and_update(&item, &eight).await.unwrap();

        let err = store.compare_and_update(&item, &eight).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.get(item.id).await.unwrap().unwrap().quantity, 8);
    }

    #[tokio::test]
    async fn first_adjustment_below_zero_creates_nothing() {
        let store = InMemoryInventoryStore::new();
        let k = key();
        assert!(store.try_apply(&k, StockDelta::adjustment(-1)).await.is_err());
        assert!(store.get(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transaction_lookups_are_newest_first() {
        let store = InMemoryTransactionLogStore::new();
        let k = key();
        let user = UserId::new();
        let t0 = Utc::now();
        let older = TransactionLogEntry::new(
            wareflow_inventory::TransactionType::Incoming,
            k,
            5,
            0,
            user,
            t0,
        );
        let newer = TransactionLogEntry::new(
            wareflow_inventory::TransactionType::Outgoing,
            k,
            -2,
            5,
            user,
            t0 + chrono::Duration::seconds(1),
        );
        store.append(&older).await.unwrap();
        store.append(&newer).await.unwrap();

        let found = store.find_by_product(k.product_id).await.unwrap();
        assert_eq!(found.iter().map(|e| e.id).collect::<Vec<_>>(), vec![newer.id, older.id]);
        assert!(store.append(&older).await.is_err());
    }
}
