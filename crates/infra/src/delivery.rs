//! DeliveryRouteBuilder: turns outgoing documents into persisted delivery runs.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};

use wareflow_core::{DeliveryId, DocumentId, DomainError, UserId};
use wareflow_delivery::{
    DeliveryItem, DeliveryItemView, DeliveryPatch, DeliverySchedule, DeliveryView, apply_patch,
    plan_route,
};

use crate::error::{ServiceError, ServiceResult};
use crate::saga::{InsertDeliveryHeader, InsertDeliveryItems, Saga};
use crate::store::{AddressStore, CustomerStore, DeliveryStore, DocumentStore, Stores};

/// Input of `create_delivery`. Times are `HH:MM` or `HH:MM:SS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDelivery {
    pub date: NaiveDate,
    pub start_time: String,
    pub unload_time: String,
    pub time_in_progress: String,
    pub doc_ids: Vec<DocumentId>,
}

#[derive(Clone)]
pub struct DeliveryRouteBuilder {
    documents: Arc<dyn DocumentStore>,
    deliveries: Arc<dyn DeliveryStore>,
    addresses: Arc<dyn AddressStore>,
    customers: Arc<dyn CustomerStore>,
}

impl DeliveryRouteBuilder {
    pub fn new(stores: &Stores) -> Self {
        Self {
            documents: stores.documents.clone(),
            deliveries: stores.deliveries.clone(),
            addresses: stores.addresses.clone(),
            customers: stores.customers.clone(),
        }
    }

    /// Plan and persist a delivery run. Header and stops are written as one saga.
    #[instrument(skip(self, new), fields(date = %new.date, docs = new.doc_ids.len()), err)]
    pub async fn create_delivery(&self, new: NewDelivery, actor: UserId) -> ServiceResult<DeliveryView> {
        if new.doc_ids.is_empty() {
            return Err(DomainError::validation("a delivery needs at least one document").into());
        }
        let schedule = DeliverySchedule::parse(
            new.date,
            &new.start_time,
            &new.unload_time,
            &new.time_in_progress,
        )?;

        let mut documents = Vec::with_capacity(new.doc_ids.len());
        for id in &new.doc_ids {
            let doc = self
                .documents
                .get(*id)
                .await?
                .ok_or_else(|| ServiceError::not_found("document", id))?;
            documents.push(doc);
        }

        let plan = plan_route(&schedule, &documents, Utc::now())?;
        Saga::new("create_delivery")
            .step(InsertDeliveryHeader::new(self.deliveries.clone(), plan.delivery.clone()))
            .step(InsertDeliveryItems::new(self.deliveries.clone(), plan.items.clone()))
            .run()
            .await?;

        info!(
            delivery_id = %plan.delivery.id,
            stops = plan.items.len(),
            requested_by = %actor,
            "delivery created"
        );
        let items = self.enrich(plan.items).await?;
        Ok(DeliveryView {
            delivery_doc: plan.delivery,
            delivery_items: items,
        })
    }

    pub async fn get_delivery(&self, id: DeliveryId) -> ServiceResult<DeliveryView> {
        let delivery = self
            .deliveries
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("delivery", id))?;
        let items = self.deliveries.items_for(id).await?;
        Ok(DeliveryView {
            delivery_doc: delivery,
            delivery_items: self.enrich(items).await?,
        })
    }

    /// Deliveries dated within `[start, end]` with enriched stops.
    pub async fn get_doc_deliveries(&self, start: NaiveDate, end: NaiveDate) -> ServiceResult<Vec<DeliveryView>> {
        if end < start {
            return Err(DomainError::validation(format!("endDate {end} is before startDate {start}")).into());
        }
        let headers = self.deliveries.list_by_date_range(start, end).await?;
        let mut views = Vec::with_capacity(headers.len());
        for delivery in headers {
            let items = self.deliveries.items_for(delivery.id).await?;
            views.push(DeliveryView {
                delivery_doc: delivery,
                delivery_items: self.enrich(items).await?,
            });
        }
        Ok(views)
    }

    #[instrument(skip(self, patch), err)]
    pub async fn update_delivery(&self, id: DeliveryId, patch: DeliveryPatch) -> ServiceResult<DeliveryView> {
        let mut delivery = self
            .deliveries
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("delivery", id))?;
        let mut items = self.deliveries.items_for(id).await?;
        apply_patch(&mut delivery, &mut items, &patch)?;

        self.deliveries.update_header(&delivery).await?;
        for item in &items {
            self.deliveries.update_item(item).await?;
        }
        info!(delivery_id = %id, "delivery updated");
        Ok(DeliveryView {
            delivery_doc: delivery,
            delivery_items: self.enrich(items).await?,
        })
    }

    #[instrument(skip(self), err)]
    pub async fn delete_delivery(&self, id: DeliveryId) -> ServiceResult<()> {
        self.deliveries.delete(id).await?;
        info!(delivery_id = %id, "delivery deleted");
        Ok(())
    }

    async fn enrich(&self, mut items: Vec<DeliveryItem>) -> ServiceResult<Vec<DeliveryItemView>> {
        items.sort_by_key(|i| i.planned_time);
        let mut views = Vec::with_capacity(items.len());
        for item in items {
            let address = match item.address_id {
                Some(id) => self.addresses.find(id).await?,
                None => None,
            };
            let customer = match item.customer_id {
                Some(id) => self.customers.find(id).await?,
                None => None,
            };
            views.push(DeliveryItemView::new(item, address.as_ref(), customer.as_ref()));
        }
        Ok(views)
    }
}
