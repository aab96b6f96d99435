//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (check constraint violation) | `23514` | `BoundViolation` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / other | N/A | `Backend` |
//!
//! ## Atomic stock updates
//!
//! `try_apply` is a single `INSERT … ON CONFLICT DO UPDATE … WHERE` statement:
//! the guard runs inside the row lock taken by the upsert, so concurrent
//! adjustments can never drive a quantity below zero. A guard miss returns no
//! row; a negative first insert trips the `CHECK` constraint.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use wareflow_core::{
    AddressId, BatchId, CustomerId, DeliveryId, DeliveryItemId, DocumentId, LineItemId, ProductId,
    SupplierId, TransactionId, UserId, WarehouseId,
};
use wareflow_delivery::{Address, Customer, DeliveryDocument, DeliveryItem};
use wareflow_documents::{
    Batch, Counterpart, DocTotals, Document, DocumentFilter, DocumentLineItem, DocumentStatus,
    DocumentType, WarehouseRef,
};
use wareflow_inventory::{
    InventoryRecord, StockDelta, StockKey, TransactionLogEntry, TransactionType,
};

use super::{
    AddressStore, BatchStore, CustomerStore, DeliveryStore, DocumentStore, InventoryStore,
    LineItemStore, StoreError, StoreResult, TransactionLogStore,
};

const SCHEMA: &str = include_str!("schema.sql");

/// Create tables and indexes if they do not exist yet.
pub async fn apply_schema(pool: &PgPool) -> StoreResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("apply_schema", e))?;
    Ok(())
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23514") => StoreError::BoundViolation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn corrupt(table: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("corrupt {table} row: {err}"))
}

fn opt_uuid<T>(id: Option<T>, f: impl Fn(&T) -> &Uuid) -> Option<Uuid> {
    id.as_ref().map(|v| *f(v))
}

// Documents

#[derive(Debug)]
struct DocumentRow {
    id: Uuid,
    doc_type: String,
    status: String,
    warehouse_id: Uuid,
    to_warehouse_id: Option<Uuid>,
    customer_id: Option<Uuid>,
    supplier_id: Option<Uuid>,
    address_id: Option<Uuid>,
    summ: i64,
    item_count: i64,
    created_at: DateTime<Utc>,
    created_by: Uuid,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for DocumentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(DocumentRow {
            id: row.try_get("id")?,
            doc_type: row.try_get("doc_type")?,
            status: row.try_get("status")?,
            warehouse_id: row.try_get("warehouse_id")?,
            to_warehouse_id: row.try_get("to_warehouse_id")?,
            customer_id: row.try_get("customer_id")?,
            supplier_id: row.try_get("supplier_id")?,
            address_id: row.try_get("address_id")?,
            summ: row.try_get("summ")?,
            item_count: row.try_get("item_count")?,
            created_at: row.try_get("created_at")?,
            created_by: row.try_get("created_by")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, StoreError> {
        let doc_type = DocumentType::parse(&row.doc_type).map_err(|e| corrupt("documents", e))?;
        let status =
            DocumentStatus::parse(doc_type, &row.status).map_err(|e| corrupt("documents", e))?;
        let from = WarehouseId::from_uuid(row.warehouse_id);
        let warehouses = match row.to_warehouse_id {
            Some(to) => WarehouseRef::Transfer {
                from,
                to: WarehouseId::from_uuid(to),
            },
            None => WarehouseRef::Single(from),
        };
        let counterpart = match (row.customer_id, row.supplier_id) {
            (Some(c), _) => Counterpart::Customer(CustomerId::from_uuid(c)),
            (None, Some(s)) => Counterpart::Supplier(SupplierId::from_uuid(s)),
            (None, None) => Counterpart::None,
        };
        Ok(Document {
            id: DocumentId::from_uuid(row.id),
            doc_type,
            status,
            warehouses,
            counterpart,
            address_id: row.address_id.map(AddressId::from_uuid),
            summ: row.summ,
            item_count: row.item_count,
            created_at: row.created_at,
            created_by: UserId::from_uuid(row.created_by),
            updated_at: row.updated_at,
        })
    }
}

const DOCUMENT_COLUMNS: &str = "id, doc_type, status, warehouse_id, to_warehouse_id, customer_id, \
     supplier_id, address_id, summ, item_count, created_at, created_by, updated_at";

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, id: DocumentId) -> StoreResult<Option<Document>> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1");
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_document", e))?;
        row.map(Document::try_from).transpose()
    }

    async fn insert(&self, doc: &Document) -> StoreResult<()> {
        let (warehouse_id, to_warehouse_id) = match doc.warehouses {
            WarehouseRef::Single(w) => (w, None),
            WarehouseRef::Transfer { from, to } => (from, Some(to)),
        };
        let (customer_id, supplier_id) = match doc.counterpart {
            Counterpart::None => (None, None),
            Counterpart::Customer(c) => (Some(*c.as_uuid()), None),
            Counterpart::Supplier(s) => (None, Some(*s.as_uuid())),
        };

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, doc_type, status, warehouse_id, to_warehouse_id, customer_id,
                supplier_id, address_id, summ, item_count, created_at, created_by, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(doc.id.as_uuid())
        .bind(doc.doc_type.as_str())
        .bind(doc.status.as_str())
        .bind(warehouse_id.as_uuid())
        .bind(opt_uuid(to_warehouse_id, WarehouseId::as_uuid))
        .bind(customer_id)
        .bind(supplier_id)
        .bind(opt_uuid(doc.address_id, AddressId::as_uuid))
        .bind(doc.summ)
        .bind(doc.item_count)
        .bind(doc.created_at)
        .bind(doc.created_by.as_uuid())
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_document", e))?;
        Ok(())
    }

    async fn list(&self, filter: &DocumentFilter) -> StoreResult<Vec<Document>> {
        let sql = format!(
            r#"
            SELECT {DOCUMENT_COLUMNS}
            FROM documents
            WHERE ($1::uuid IS NULL OR warehouse_id = $1 OR to_warehouse_id = $1)
                AND ($2::text IS NULL OR doc_type = $2)
                AND ($3::text IS NULL OR status = $3)
                AND ($4::timestamptz IS NULL OR created_at >= $4)
                AND ($5::timestamptz IS NULL OR created_at <= $5)
            ORDER BY created_at DESC, id DESC
            "#
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(opt_uuid(filter.warehouse_id, WarehouseId::as_uuid))
            .bind(filter.doc_type.map(|t| t.as_str()))
            .bind(filter.status.as_deref())
            .bind(filter.created_from)
            .bind(filter.created_to)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_documents", e))?;
        rows.into_iter().map(Document::try_from).collect()
    }

    #[instrument(skip(self), fields(document_id = %id), err)]
    async fn compare_and_set_status(
        &self,
        id: DocumentId,
        expected: DocumentStatus,
        next: DocumentStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE documents SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2",
        )
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_status", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }
        let exists = sqlx::query("SELECT 1 FROM documents WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_status", e))?
            .is_some();
        if exists {
            Err(StoreError::Conflict(format!(
                "document {id} is no longer in status {expected}"
            )))
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }

    async fn set_totals(&self, id: DocumentId, totals: DocTotals, at: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE documents SET summ = $2, item_count = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(totals.summ)
        .bind(totals.item_count)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_totals", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: DocumentId) -> StoreResult<()> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_document", e))?;
        Ok(())
    }
}

// Line items

#[derive(Debug)]
struct LineItemRow {
    id: Uuid,
    document_id: Uuid,
    product_id: Uuid,
    batch_id: Option<Uuid>,
    quantity: i64,
    unit_price: i64,
    bonus: i64,
    created_at: DateTime<Utc>,
    created_by: Uuid,
}

impl<'r> FromRow<'r, PgRow> for LineItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LineItemRow {
            id: row.try_get("id")?,
            document_id: row.try_get("document_id")?,
            product_id: row.try_get("product_id")?,
            batch_id: row.try_get("batch_id")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            bonus: row.try_get("bonus")?,
            created_at: row.try_get("created_at")?,
            created_by: row.try_get("created_by")?,
        })
    }
}

impl From<LineItemRow> for DocumentLineItem {
    fn from(row: LineItemRow) -> Self {
        DocumentLineItem {
            id: LineItemId::from_uuid(row.id),
            document_id: DocumentId::from_uuid(row.document_id),
            product_id: ProductId::from_uuid(row.product_id),
            batch_id: row.batch_id.map(BatchId::from_uuid),
            quantity: row.quantity,
            unit_price: row.unit_price,
            bonus: row.bonus,
            created_at: row.created_at,
            created_by: UserId::from_uuid(row.created_by),
        }
    }
}

const LINE_ITEM_COLUMNS: &str =
    "id, document_id, product_id, batch_id, quantity, unit_price, bonus, created_at, created_by";

#[derive(Debug, Clone)]
pub struct PgLineItemStore {
    pool: PgPool,
}

impl PgLineItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LineItemStore for PgLineItemStore {
    async fn get(&self, id: LineItemId) -> StoreResult<Option<DocumentLineItem>> {
        let sql = format!("SELECT {LINE_ITEM_COLUMNS} FROM document_line_items WHERE id = $1");
        let row = sqlx::query_as::<_, LineItemRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_line_item", e))?;
        Ok(row.map(DocumentLineItem::from))
    }

    async fn insert(&self, item: &DocumentLineItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO document_line_items (
                id, document_id, product_id, batch_id, quantity, unit_price, bonus,
                created_at, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.document_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(opt_uuid(item.batch_id, BatchId::as_uuid))
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.bonus)
        .bind(item.created_at)
        .bind(item.created_by.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_line_item", e))?;
        Ok(())
    }

    async fn compare_and_update(&self, expected: &DocumentLineItem, next: &DocumentLineItem) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE document_line_items
            SET quantity = $2, unit_price = $3, bonus = $4, batch_id = $5
            WHERE id = $1 AND quantity = $6 AND unit_price = $7 AND bonus = $8
            "#,
        )
        .bind(next.id.as_uuid())
        .bind(next.quantity)
        .bind(next.unit_price)
        .bind(next.bonus)
        .bind(opt_uuid(next.batch_id, BatchId::as_uuid))
        .bind(expected.quantity)
        .bind(expected.unit_price)
        .bind(expected.bonus)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_line_item", e))?;
        if result.rows_affected() == 0 {
            return match self.get(next.id).await? {
                Some(_) => Err(StoreError::Conflict(format!("{} changed concurrently", next.id))),
                None => Err(StoreError::NotFound(next.id.to_string())),
            };
        }
        Ok(())
    }

    async fn delete(&self, id: LineItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM document_line_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_line_item", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_by_document(&self, document_id: DocumentId) -> StoreResult<Vec<DocumentLineItem>> {
        let sql = format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM document_line_items \
             WHERE document_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, LineItemRow>(&sql)
            .bind(document_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_line_items", e))?;
        Ok(rows.into_iter().map(DocumentLineItem::from).collect())
    }

    async fn count_by_batch(&self, batch_id: BatchId) -> StoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM document_line_items WHERE batch_id = $1")
            .bind(batch_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_by_batch", e))?;
        row.try_get("n").map_err(|e| map_sqlx_error("count_by_batch", e))
    }
}

// Inventory

fn batch_key(batch_id: Option<BatchId>) -> Uuid {
    batch_id.map(|b| *b.as_uuid()).unwrap_or_else(Uuid::nil)
}

#[derive(Debug)]
struct InventoryRow {
    product_id: Uuid,
    batch_key: Uuid,
    warehouse_id: Uuid,
    quantity_available: i64,
    quantity_reserved: i64,
}

impl<'r> FromRow<'r, PgRow> for InventoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(InventoryRow {
            product_id: row.try_get("product_id")?,
            batch_key: row.try_get("batch_key")?,
            warehouse_id: row.try_get("warehouse_id")?,
            quantity_available: row.try_get("quantity_available")?,
            quantity_reserved: row.try_get("quantity_reserved")?,
        })
    }
}

impl From<InventoryRow> for InventoryRecord {
    fn from(row: InventoryRow) -> Self {
        let batch_id = (!row.batch_key.is_nil()).then(|| BatchId::from_uuid(row.batch_key));
        InventoryRecord {
            key: StockKey::new(
                ProductId::from_uuid(row.product_id),
                batch_id,
                WarehouseId::from_uuid(row.warehouse_id),
            ),
            quantity_available: row.quantity_available,
            quantity_reserved: row.quantity_reserved,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn get(&self, key: &StockKey) -> StoreResult<Option<InventoryRecord>> {
        let row = sqlx::query_as::<_, InventoryRow>(
            r#"
            SELECT product_id, batch_key, warehouse_id, quantity_available, quantity_reserved
            FROM inventory
            WHERE product_id = $1 AND batch_key = $2 AND warehouse_id = $3
            "#,
        )
        .bind(key.product_id.as_uuid())
        .bind(batch_key(key.batch_id))
        .bind(key.warehouse_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_inventory", e))?;
        Ok(row.map(InventoryRecord::from))
    }

    async fn list_for(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> StoreResult<Vec<InventoryRecord>> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            r#"
            SELECT product_id, batch_key, warehouse_id, quantity_available, quantity_reserved
            FROM inventory
            WHERE product_id = $1 AND warehouse_id = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(warehouse_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_inventory", e))?;
        Ok(rows.into_iter().map(InventoryRecord::from).collect())
    }

    #[instrument(skip(self), err)]
    async fn try_apply(&self, key: &StockKey, delta: StockDelta) -> StoreResult<InventoryRecord> {
        let row = sqlx::query_as::<_, InventoryRow>(
            r#"
            INSERT INTO inventory (
                product_id, batch_key, warehouse_id, quantity_available, quantity_reserved
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (product_id, batch_key, warehouse_id) DO UPDATE
            SET quantity_available = inventory.quantity_available + EXCLUDED.quantity_available,
                quantity_reserved = inventory.quantity_reserved + EXCLUDED.quantity_reserved
            WHERE inventory.quantity_available + EXCLUDED.quantity_available >= 0
                AND inventory.quantity_reserved + EXCLUDED.quantity_reserved >= 0
            RETURNING product_id, batch_key, warehouse_id, quantity_available, quantity_reserved
            "#,
        )
        .bind(key.product_id.as_uuid())
        .bind(batch_key(key.batch_id))
        .bind(key.warehouse_id.as_uuid())
        .bind(delta.available)
        .bind(delta.reserved)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("try_apply", e))?;

        row.map(InventoryRecord::from).ok_or_else(|| {
            StoreError::BoundViolation(format!(
                "{key}: adjustment by {}/{} would go negative",
                delta.available, delta.reserved
            ))
        })
    }
}

// Transaction log

#[derive(Debug)]
struct TransactionRow {
    id: Uuid,
    transaction_type: String,
    product_id: Uuid,
    batch_id: Option<Uuid>,
    warehouse_id: Uuid,
    quantity_change: i64,
    quantity_before: i64,
    occurred_at: DateTime<Utc>,
    user_id: Uuid,
    document_id: Option<Uuid>,
    line_item_id: Option<Uuid>,
}

impl<'r> FromRow<'r, PgRow> for TransactionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransactionRow {
            id: row.try_get("id")?,
            transaction_type: row.try_get("transaction_type")?,
            product_id: row.try_get("product_id")?,
            batch_id: row.try_get("batch_id")?,
            warehouse_id: row.try_get("warehouse_id")?,
            quantity_change: row.try_get("quantity_change")?,
            quantity_before: row.try_get("quantity_before")?,
            occurred_at: row.try_get("occurred_at")?,
            user_id: row.try_get("user_id")?,
            document_id: row.try_get("document_id")?,
            line_item_id: row.try_get("line_item_id")?,
        })
    }
}

impl TryFrom<TransactionRow> for TransactionLogEntry {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, StoreError> {
        let transaction_type = TransactionType::parse(&row.transaction_type).ok_or_else(|| {
            corrupt("transaction_log", format!("unknown type '{}'", row.transaction_type))
        })?;
        Ok(TransactionLogEntry {
            id: TransactionId::from_uuid(row.id),
            transaction_type,
            product_id: ProductId::from_uuid(row.product_id),
            batch_id: row.batch_id.map(BatchId::from_uuid),
            warehouse_id: WarehouseId::from_uuid(row.warehouse_id),
            quantity_change: row.quantity_change,
            quantity_before: row.quantity_before,
            occurred_at: row.occurred_at,
            user_id: UserId::from_uuid(row.user_id),
            document_id: row.document_id.map(DocumentId::from_uuid),
            line_item_id: row.line_item_id.map(LineItemId::from_uuid),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgTransactionLogStore {
    pool: PgPool,
}

impl PgTransactionLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by(&self, column: &'static str, value: Uuid) -> StoreResult<Vec<TransactionLogEntry>> {
        let sql = format!(
            r#"
            SELECT id, transaction_type, product_id, batch_id, warehouse_id, quantity_change,
                quantity_before, occurred_at, user_id, document_id, line_item_id
            FROM transaction_log
            WHERE {column} = $1
            ORDER BY occurred_at DESC, id DESC
            "#
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_transactions", e))?;
        rows.into_iter().map(TransactionLogEntry::try_from).collect()
    }
}

#[async_trait]
impl TransactionLogStore for PgTransactionLogStore {
    async fn append(&self, entry: &TransactionLogEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transaction_log (
                id, transaction_type, product_id, batch_id, warehouse_id, quantity_change,
                quantity_before, occurred_at, user_id, document_id, line_item_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.transaction_type.as_str())
        .bind(entry.product_id.as_uuid())
        .bind(opt_uuid(entry.batch_id, BatchId::as_uuid))
        .bind(entry.warehouse_id.as_uuid())
        .bind(entry.quantity_change)
        .bind(entry.quantity_before)
        .bind(entry.occurred_at)
        .bind(entry.user_id.as_uuid())
        .bind(opt_uuid(entry.document_id, DocumentId::as_uuid))
        .bind(opt_uuid(entry.line_item_id, LineItemId::as_uuid))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_transaction", e))?;
        Ok(())
    }

    async fn find_by_product(&self, product_id: ProductId) -> StoreResult<Vec<TransactionLogEntry>> {
        self.find_by("product_id", *product_id.as_uuid()).await
    }

    async fn find_by_batch(&self, batch_id: BatchId) -> StoreResult<Vec<TransactionLogEntry>> {
        self.find_by("batch_id", *batch_id.as_uuid()).await
    }

    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Vec<TransactionLogEntry>> {
        self.find_by("user_id", *user_id.as_uuid()).await
    }
}

// Batches

#[derive(Debug)]
struct BatchRow {
    id: Uuid,
    product_id: Uuid,
    quantity_received: i64,
    expires_on: Option<NaiveDate>,
    received_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for BatchRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(BatchRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            quantity_received: row.try_get("quantity_received")?,
            expires_on: row.try_get("expires_on")?,
            received_at: row.try_get("received_at")?,
        })
    }
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: BatchId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity_received: row.quantity_received,
            expires_on: row.expires_on,
            received_at: row.received_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgBatchStore {
    pool: PgPool,
}

impl PgBatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchStore for PgBatchStore {
    async fn get(&self, id: BatchId) -> StoreResult<Option<Batch>> {
        let row = sqlx::query_as::<_, BatchRow>(
            "SELECT id, product_id, quantity_received, expires_on, received_at FROM batches WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_batch", e))?;
        Ok(row.map(Batch::from))
    }

    async fn insert(&self, batch: &Batch) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO batches (id, product_id, quantity_received, expires_on, received_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(batch.id.as_uuid())
        .bind(batch.product_id.as_uuid())
        .bind(batch.quantity_received)
        .bind(batch.expires_on)
        .bind(batch.received_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_batch", e))?;
        Ok(())
    }

    async fn list_by_product(&self, product_id: ProductId) -> StoreResult<Vec<Batch>> {
        let rows = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, product_id, quantity_received, expires_on, received_at
            FROM batches
            WHERE product_id = $1
            ORDER BY received_at, id
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_batches", e))?;
        Ok(rows.into_iter().map(Batch::from).collect())
    }

    async fn delete(&self, id: BatchId) -> StoreResult<()> {
        sqlx::query("DELETE FROM batches WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_batch", e))?;
        Ok(())
    }
}

// Deliveries

#[derive(Debug)]
struct DeliveryRow {
    id: Uuid,
    delivery_date: NaiveDate,
    start_time: DateTime<Utc>,
    unload_seconds: i64,
    time_in_progress_seconds: i64,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    total_count_entity: i64,
    total_count_doc: i64,
    total_sum: i64,
}

impl<'r> FromRow<'r, PgRow> for DeliveryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(DeliveryRow {
            id: row.try_get("id")?,
            delivery_date: row.try_get("delivery_date")?,
            start_time: row.try_get("start_time")?,
            unload_seconds: row.try_get("unload_seconds")?,
            time_in_progress_seconds: row.try_get("time_in_progress_seconds")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            total_count_entity: row.try_get("total_count_entity")?,
            total_count_doc: row.try_get("total_count_doc")?,
            total_sum: row.try_get("total_sum")?,
        })
    }
}

impl From<DeliveryRow> for DeliveryDocument {
    fn from(row: DeliveryRow) -> Self {
        DeliveryDocument {
            id: DeliveryId::from_uuid(row.id),
            date: row.delivery_date,
            start_time: row.start_time,
            unload_seconds: row.unload_seconds,
            time_in_progress_seconds: row.time_in_progress_seconds,
            created_by: UserId::from_uuid(row.created_by),
            created_at: row.created_at,
            total_count_entity: row.total_count_entity,
            total_count_doc: row.total_count_doc,
            total_sum: row.total_sum,
        }
    }
}

#[derive(Debug)]
struct DeliveryItemRow {
    id: Uuid,
    delivery_id: Uuid,
    address_id: Option<Uuid>,
    customer_id: Option<Uuid>,
    doc_ids: Vec<Uuid>,
    entity_count: i64,
    summ: i64,
    planned_time: DateTime<Utc>,
    actual_time: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for DeliveryItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(DeliveryItemRow {
            id: row.try_get("id")?,
            delivery_id: row.try_get("delivery_id")?,
            address_id: row.try_get("address_id")?,
            customer_id: row.try_get("customer_id")?,
            doc_ids: row.try_get("doc_ids")?,
            entity_count: row.try_get("entity_count")?,
            summ: row.try_get("summ")?,
            planned_time: row.try_get("planned_time")?,
            actual_time: row.try_get("actual_time")?,
        })
    }
}

impl From<DeliveryItemRow> for DeliveryItem {
    fn from(row: DeliveryItemRow) -> Self {
        DeliveryItem {
            id: DeliveryItemId::from_uuid(row.id),
            delivery_id: DeliveryId::from_uuid(row.delivery_id),
            address_id: row.address_id.map(AddressId::from_uuid),
            customer_id: row.customer_id.map(CustomerId::from_uuid),
            doc_ids: row.doc_ids.into_iter().map(DocumentId::from_uuid).collect(),
            entity_count: row.entity_count,
            summ: row.summ,
            planned_time: row.planned_time,
            actual_time: row.actual_time,
        }
    }
}

const DELIVERY_COLUMNS: &str = "id, delivery_date, start_time, unload_seconds, \
     time_in_progress_seconds, created_by, created_at, total_count_entity, total_count_doc, total_sum";

#[derive(Debug, Clone)]
pub struct PgDeliveryStore {
    pool: PgPool,
}

impl PgDeliveryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryStore for PgDeliveryStore {
    async fn insert_header(&self, delivery: &DeliveryDocument) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO deliveries (
                id, delivery_date, start_time, unload_seconds, time_in_progress_seconds,
                created_by, created_at, total_count_entity, total_count_doc, total_sum
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(delivery.id.as_uuid())
        .bind(delivery.date)
        .bind(delivery.start_time)
        .bind(delivery.unload_seconds)
        .bind(delivery.time_in_progress_seconds)
        .bind(delivery.created_by.as_uuid())
        .bind(delivery.created_at)
        .bind(delivery.total_count_entity)
        .bind(delivery.total_count_doc)
        .bind(delivery.total_sum)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_delivery", e))?;
        Ok(())
    }

    async fn insert_items(&self, items: &[DeliveryItem]) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        for item in items {
            let doc_ids: Vec<Uuid> = item.doc_ids.iter().map(|d| *d.as_uuid()).collect();
            sqlx::query(
                r#"
                INSERT INTO delivery_items (
                    id, delivery_id, address_id, customer_id, doc_ids, entity_count, summ,
                    planned_time, actual_time
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.delivery_id.as_uuid())
            .bind(opt_uuid(item.address_id, AddressId::as_uuid))
            .bind(opt_uuid(item.customer_id, CustomerId::as_uuid))
            .bind(doc_ids)
            .bind(item.entity_count)
            .bind(item.summ)
            .bind(item.planned_time)
            .bind(item.actual_time)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_delivery_item", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn get(&self, id: DeliveryId) -> StoreResult<Option<DeliveryDocument>> {
        let sql = format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = $1");
        let row = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_delivery", e))?;
        Ok(row.map(DeliveryDocument::from))
    }

    async fn items_for(&self, id: DeliveryId) -> StoreResult<Vec<DeliveryItem>> {
        let rows = sqlx::query_as::<_, DeliveryItemRow>(
            r#"
            SELECT id, delivery_id, address_id, customer_id, doc_ids, entity_count, summ,
                planned_time, actual_time
            FROM delivery_items
            WHERE delivery_id = $1
            ORDER BY planned_time, id
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_delivery_items", e))?;
        Ok(rows.into_iter().map(DeliveryItem::from).collect())
    }

    async fn list_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<DeliveryDocument>> {
        let sql = format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries \
             WHERE delivery_date BETWEEN $1 AND $2 ORDER BY delivery_date, start_time, id"
        );
        let rows = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_deliveries", e))?;
        Ok(rows.into_iter().map(DeliveryDocument::from).collect())
    }

    async fn update_header(&self, delivery: &DeliveryDocument) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE deliveries
            SET start_time = $2, unload_seconds = $3, time_in_progress_seconds = $4
            WHERE id = $1
            "#,
        )
        .bind(delivery.id.as_uuid())
        .bind(delivery.start_time)
        .bind(delivery.unload_seconds)
        .bind(delivery.time_in_progress_seconds)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_delivery", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(delivery.id.to_string()));
        }
        Ok(())
    }

    async fn update_item(&self, item: &DeliveryItem) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE delivery_items SET planned_time = $2, actual_time = $3 WHERE id = $1",
        )
        .bind(item.id.as_uuid())
        .bind(item.planned_time)
        .bind(item.actual_time)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_delivery_item", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(item.id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: DeliveryId) -> StoreResult<()> {
        // Items go with the header (ON DELETE CASCADE).
        sqlx::query("DELETE FROM deliveries WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_delivery", e))?;
        Ok(())
    }
}

// Reference data

#[derive(Debug, Clone)]
pub struct PgAddressStore {
    pool: PgPool,
}

impl PgAddressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressStore for PgAddressStore {
    async fn find(&self, id: AddressId) -> StoreResult<Option<Address>> {
        let row = sqlx::query("SELECT address, phone FROM addresses WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_address", e))?;
        row.map(|r| -> Result<Address, sqlx::Error> {
            Ok(Address {
                id,
                address: r.try_get("address")?,
                phone: r.try_get("phone")?,
            })
        })
        .transpose()
        .map_err(|e| map_sqlx_error("find_address", e))
    }
}

#[derive(Debug, Clone)]
pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn find(&self, id: CustomerId) -> StoreResult<Option<Customer>> {
        let row = sqlx::query("SELECT name, address, phone FROM customers WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_customer", e))?;
        row.map(|r| -> Result<Customer, sqlx::Error> {
            Ok(Customer {
                id,
                name: r.try_get("name")?,
                address: r.try_get("address")?,
                phone: r.try_get("phone")?,
            })
        })
        .transpose()
        .map_err(|e| map_sqlx_error("find_customer", e))
    }
}
