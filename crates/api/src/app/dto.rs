use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use wareflow_core::{
    AddressId, BatchId, CustomerId, DocumentId, DomainError, DomainResult, Money, ProductId,
    Quantity, SupplierId, WarehouseId,
};
use wareflow_documents::{
    Counterpart, DocumentFilter, DocumentType, NewBatch, NewDocument, NewLineItem, WarehouseRef,
};
use wareflow_infra::NewDelivery;
use wareflow_inventory::ReservationRequest;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub doc_id: DocumentId,
    pub product_id: ProductId,
    #[serde(default)]
    pub batch_id: Option<BatchId>,
    #[serde(default)]
    pub new_batch: Option<NewBatch>,
    pub quantity: Quantity,
    pub unit_price: Money,
    #[serde(default)]
    pub bonus: Money,
}

impl From<AddItemRequest> for NewLineItem {
    fn from(r: AddItemRequest) -> Self {
        NewLineItem {
            document_id: r.doc_id,
            product_id: r.product_id,
            batch_id: r.batch_id,
            new_batch: r.new_batch,
            quantity: r.quantity,
            unit_price: r.unit_price,
            bonus: r.bonus,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub doc_type: String,
    #[serde(default)]
    pub warehouse_id: Option<WarehouseId>,
    #[serde(default)]
    pub from_warehouse_id: Option<WarehouseId>,
    #[serde(default)]
    pub to_warehouse_id: Option<WarehouseId>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub address_id: Option<AddressId>,
}

impl CreateDocumentRequest {
    pub fn into_new_document(self) -> DomainResult<NewDocument> {
        let doc_type = DocumentType::parse(&self.doc_type)?;

        let warehouses = match (self.warehouse_id, self.from_warehouse_id, self.to_warehouse_id) {
            (Some(w), None, None) => WarehouseRef::Single(w),
            (None, Some(from), Some(to)) => WarehouseRef::Transfer { from, to },
            _ => {
                return Err(DomainError::validation(
                    "give either warehouseId or both fromWarehouseId and toWarehouseId",
                ));
            }
        };

        let counterpart = match (self.customer_id, self.supplier_id) {
            (None, None) => Counterpart::None,
            (Some(c), None) => Counterpart::Customer(c),
            (None, Some(s)) => Counterpart::Supplier(s),
            (Some(_), Some(_)) => {
                return Err(DomainError::validation(
                    "customerId and supplierId are mutually exclusive",
                ));
            }
        };

        Ok(NewDocument {
            doc_type,
            warehouses,
            counterpart,
            address_id: self.address_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsQuery {
    pub warehouse_id: Option<WarehouseId>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub status: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DocumentsQuery {
    pub fn into_filter(self) -> DomainResult<DocumentFilter> {
        Ok(DocumentFilter {
            warehouse_id: self.warehouse_id,
            doc_type: self.doc_type.as_deref().map(DocumentType::parse).transpose()?,
            status: self.status,
            created_from: self.from,
            created_to: self.to,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    pub warehouse_id: WarehouseId,
    pub items: Vec<ReservationRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchesQuery {
    pub product_id: Option<ProductId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    pub product_id: Option<ProductId>,
    pub batch_id: Option<BatchId>,
    pub user_id: Option<wareflow_core::UserId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeliveryRequest {
    pub date: NaiveDate,
    pub start_time: String,
    pub unload_time: String,
    pub time_in_progress: String,
    pub doc_ids: Vec<DocumentId>,
}

impl From<CreateDeliveryRequest> for NewDelivery {
    fn from(r: CreateDeliveryRequest) -> Self {
        NewDelivery {
            date: r.date,
            start_time: r.start_time,
            unload_time: r.unload_time,
            time_in_progress: r.time_in_progress,
            doc_ids: r.doc_ids,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
