use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{
    AddressId, CustomerId, DeliveryId, DeliveryItemId, DocumentId, DomainError, DomainResult,
    Entity, Money, Quantity, UserId,
};

/// One planned delivery run (header).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDocument {
    pub id: DeliveryId,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    /// Per-stop unload duration.
    pub unload_seconds: i64,
    /// Inter-stop travel interval. Recorded, not used for planned times.
    pub time_in_progress_seconds: i64,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub total_count_entity: Quantity,
    pub total_count_doc: i64,
    pub total_sum: Money,
}

impl Entity for DeliveryDocument {
    type Id = DeliveryId;

    fn id(&self) -> DeliveryId {
        self.id
    }
}

/// One stop of a delivery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryItem {
    pub id: DeliveryItemId,
    pub delivery_id: DeliveryId,
    pub address_id: Option<AddressId>,
    pub customer_id: Option<CustomerId>,
    pub doc_ids: Vec<DocumentId>,
    pub entity_count: Quantity,
    pub summ: Money,
    pub planned_time: DateTime<Utc>,
    pub actual_time: Option<DateTime<Utc>>,
}

impl DeliveryItem {
    /// Fold another stop for the same destination into this one.
    ///
    /// The planned time of `self` (the earlier stop) is kept.
    pub fn absorb(&mut self, other: DeliveryItem) -> DomainResult<()> {
        let id = self.id;
        let out_of_range = move || DomainError::validation(format!("stop {id} totals are out of range"));
        let entity_count = self
            .entity_count
            .checked_add(other.entity_count)
            .ok_or_else(out_of_range)?;
        let summ = self.summ.checked_add(other.summ).ok_or_else(out_of_range)?;

        self.entity_count = entity_count;
        self.summ = summ;
        self.doc_ids.extend(other.doc_ids);
        if self.customer_id.is_none() {
            self.customer_id = other.customer_id;
        }
        Ok(())
    }
}

impl Entity for DeliveryItem {
    type Id = DeliveryItemId;

    fn id(&self) -> DeliveryItemId {
        self.id
    }
}
