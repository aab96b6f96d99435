//! Route planning: documents in, one delivery header plus merged stops out.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{AddressId, DeliveryId, DeliveryItemId, DomainError, DomainResult};
use wareflow_documents::{Document, DocumentType};

use crate::model::{DeliveryDocument, DeliveryItem};
use crate::time::{anchor, parse_duration, parse_time_of_day};

/// Parsed timing parameters of a delivery run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeliverySchedule {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub unload: Duration,
    pub time_in_progress: Duration,
}

impl DeliverySchedule {
    pub fn parse(
        date: NaiveDate,
        start_time: &str,
        unload_time: &str,
        time_in_progress: &str,
    ) -> DomainResult<Self> {
        Ok(Self {
            date,
            start: anchor(date, parse_time_of_day(start_time)?),
            unload: parse_duration(unload_time)?,
            time_in_progress: parse_duration(time_in_progress)?,
        })
    }

    /// Planned arrival of the stop at `index` (input order, before merging).
    pub fn planned_time(&self, index: usize) -> DateTime<Utc> {
        self.start + Duration::seconds(self.unload.num_seconds() * index as i64)
    }
}

/// Header and stops ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePlan {
    pub delivery: DeliveryDocument,
    pub items: Vec<DeliveryItem>,
}

/// Build a delivery run from outgoing documents, in the given order.
///
/// Stop `i` is planned at `start + i × unload`; stops sharing a destination
/// address (documents without one count as one destination) are then merged,
/// keeping the earliest planned time.
pub fn plan_route(
    schedule: &DeliverySchedule,
    documents: &[Document],
    now: DateTime<Utc>,
) -> DomainResult<RoutePlan> {
    let Some(first) = documents.first() else {
        return Err(DomainError::validation("a delivery needs at least one document"));
    };
    if let Some(doc) = documents.iter().find(|d| d.doc_type != DocumentType::Outgoing) {
        return Err(DomainError::validation(format!(
            "document {} is {}, only outgoing documents can be delivered",
            doc.id, doc.doc_type
        )));
    }

    let delivery_id = DeliveryId::new();
    let stops = documents.iter().enumerate().map(|(i, doc)| DeliveryItem {
        id: DeliveryItemId::new(),
        delivery_id,
        address_id: doc.address_id,
        customer_id: doc.counterpart.customer_id(),
        doc_ids: vec![doc.id],
        entity_count: doc.item_count,
        summ: doc.summ,
        planned_time: schedule.planned_time(i),
        actual_time: None,
    });
    let items = merge_by_address(stops)?;

    let delivery = DeliveryDocument {
        id: delivery_id,
        date: schedule.date,
        start_time: schedule.start,
        unload_seconds: schedule.unload.num_seconds(),
        time_in_progress_seconds: schedule.time_in_progress.num_seconds(),
        created_by: first.created_by,
        created_at: now,
        total_count_entity: checked_sum(documents.iter().map(|d| d.item_count), "item count")?,
        total_count_doc: documents.len() as i64,
        total_sum: checked_sum(documents.iter().map(|d| d.summ), "sum")?,
    };

    Ok(RoutePlan { delivery, items })
}

fn checked_sum(mut values: impl Iterator<Item = i64>, what: &str) -> DomainResult<i64> {
    values
        .try_fold(0i64, |acc, v| acc.checked_add(v))
        .ok_or_else(|| DomainError::validation(format!("delivery {what} is out of range")))
}

fn merge_by_address(stops: impl Iterator<Item = DeliveryItem>) -> DomainResult<Vec<DeliveryItem>> {
    let mut merged: Vec<DeliveryItem> = Vec::new();
    let mut by_address: HashMap<Option<AddressId>, usize> = HashMap::new();
    for stop in stops {
        match by_address.get(&stop.address_id) {
            Some(&idx) => merged[idx].absorb(stop)?,
            None => {
                by_address.insert(stop.address_id, merged.len());
                merged.push(stop);
            }
        }
    }
    Ok(merged)
}

/// Recorded arrival at one stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualTime {
    pub item_id: DeliveryItemId,
    pub actual_time: String,
}

/// Changes to an existing delivery run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPatch {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub actual_times: Vec<ActualTime>,
}

/// Apply a patch in place.
///
/// A new start time shifts every planned time by the same offset. Actual
/// times are anchored on the delivery date.
pub fn apply_patch(
    delivery: &mut DeliveryDocument,
    items: &mut [DeliveryItem],
    patch: &DeliveryPatch,
) -> DomainResult<()> {
    if let Some(raw) = &patch.start_time {
        let start = anchor(delivery.date, parse_time_of_day(raw)?);
        let offset = start - delivery.start_time;
        delivery.start_time = start;
        for item in items.iter_mut() {
            item.planned_time += offset;
        }
    }

    for actual in &patch.actual_times {
        let at = anchor(delivery.date, parse_time_of_day(&actual.actual_time)?);
        let item = items
            .iter_mut()
            .find(|i| i.id == actual.item_id)
            .ok_or_else(|| DomainError::not_found("delivery item", actual.item_id))?;
        item.actual_time = Some(at);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wareflow_core::{CustomerId, UserId, WarehouseId};
    use wareflow_documents::{Counterpart, NewDocument, WarehouseRef};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
    }

    fn schedule() -> DeliverySchedule {
        DeliverySchedule::parse(date(), "09:00", "00:15", "00:30").unwrap()
    }

    fn outgoing(address: Option<AddressId>, item_count: i64, summ: i64) -> Document {
        let mut doc = Document::create(
            NewDocument {
                doc_type: DocumentType::Outgoing,
                warehouses: WarehouseRef::Single(WarehouseId::new()),
                counterpart: Counterpart::Customer(CustomerId::new()),
                address_id: address,
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap();
        doc.item_count = item_count;
        doc.summ = summ;
        doc
    }

    #[test]
    fn documents_for_same_address_merge_into_one_stop() {
        let a = AddressId::new();
        let d1 = outgoing(Some(a), 3, 100);
        let d2 = outgoing(Some(a), 2, 50);

        let plan = plan_route(&schedule(), &[d1.clone(), d2.clone()], Utc::now()).unwrap();

        assert_eq!(plan.items.len(), 1);
        let stop = &plan.items[0];
        assert_eq!(stop.address_id, Some(a));
        assert_eq!(stop.entity_count, 5);
        assert_eq!(stop.summ, 150);
        assert_eq!(stop.doc_ids, vec![d1.id, d2.id]);
        assert_eq!(stop.planned_time, schedule().start);

        assert_eq!(plan.delivery.total_count_entity, 5);
        assert_eq!(plan.delivery.total_count_doc, 2);
        assert_eq!(plan.delivery.total_sum, 150);
        assert_eq!(plan.delivery.created_by, d1.created_by);
    }

    #[test]
    fn planned_times_step_by_unload_duration_in_input_order() {
        let docs = [
            outgoing(Some(AddressId::new()), 1, 10),
            outgoing(Some(AddressId::new()), 1, 10),
            outgoing(Some(AddressId::new()), 1, 10),
        ];
        let plan = plan_route(&schedule(), &docs, Utc::now()).unwrap();

        let start = schedule().start;
        let times: Vec<_> = plan.items.iter().map(|i| i.planned_time).collect();
        assert_eq!(
            times,
            vec![start, start + Duration::minutes(15), start + Duration::minutes(30)]
        );
        assert_eq!(plan.delivery.time_in_progress_seconds, 30 * 60);
    }

    #[test]
    fn documents_without_address_share_a_stop() {
        let docs = [outgoing(None, 1, 10), outgoing(Some(AddressId::new()), 1, 10), outgoing(None, 2, 5)];
        let plan = plan_route(&schedule(), &docs, Utc::now()).unwrap();

        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.items[0].address_id, None);
        assert_eq!(plan.items[0].doc_ids, vec![docs[0].id, docs[2].id]);
        assert_eq!(plan.items[0].entity_count, 3);
    }

    #[test]
    fn rejects_empty_and_non_outgoing_input() {
        assert!(matches!(
            plan_route(&schedule(), &[], Utc::now()),
            Err(DomainError::Validation(_))
        ));

        let mut doc = outgoing(None, 1, 1);
        doc.doc_type = DocumentType::Incoming;
        assert!(matches!(
            plan_route(&schedule(), &[doc], Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn patch_shifts_planned_times_and_records_arrival() {
        let docs = [outgoing(Some(AddressId::new()), 1, 10), outgoing(Some(AddressId::new()), 1, 10)];
        let mut plan = plan_route(&schedule(), &docs, Utc::now()).unwrap();
        let second = plan.items[1].id;

        let patch = DeliveryPatch {
            start_time: Some("10:00".to_string()),
            actual_times: vec![ActualTime {
                item_id: second,
                actual_time: "10:20".to_string(),
            }],
        };
        apply_patch(&mut plan.delivery, &mut plan.items, &patch).unwrap();

        let ten = anchor(date(), parse_time_of_day("10:00").unwrap());
        assert_eq!(plan.delivery.start_time, ten);
        assert_eq!(plan.items[0].planned_time, ten);
        assert_eq!(plan.items[1].planned_time, ten + Duration::minutes(15));
        assert_eq!(plan.items[1].actual_time, Some(ten + Duration::minutes(20)));
    }

    #[test]
    fn totals_beyond_money_range_are_rejected() {
        let a = AddressId::new();
        let merged = [outgoing(Some(a), 1, i64::MAX), outgoing(Some(a), 1, 1)];
        let err = plan_route(&schedule(), &merged, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let separate = [outgoing(Some(AddressId::new()), i64::MAX, 1), outgoing(None, 1, 1)];
        let err = plan_route(&schedule(), &separate, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn patch_with_unknown_item_fails() {
        let mut plan = plan_route(&schedule(), &[outgoing(None, 1, 1)], Utc::now()).unwrap();
        let patch = DeliveryPatch {
            start_time: None,
            actual_times: vec![ActualTime {
                item_id: DeliveryItemId::new(),
                actual_time: "11:00".to_string(),
            }],
        };
        let err = apply_patch(&mut plan.delivery, &mut plan.items, &patch).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: merging never loses documents, quantities or money.
        #[test]
        fn merge_preserves_totals(
            raw in prop::collection::vec((0usize..4, 0i64..50, 0i64..10_000), 1..12)
        ) {
            let addresses: Vec<AddressId> = (0..4).map(|_| AddressId::new()).collect();
            let docs: Vec<Document> = raw
                .iter()
                .map(|&(a, count, summ)| outgoing(Some(addresses[a]), count, summ))
                .collect();

            let plan = plan_route(&schedule(), &docs, Utc::now()).unwrap();

            let doc_total: usize = plan.items.iter().map(|i| i.doc_ids.len()).sum();
            prop_assert_eq!(doc_total, docs.len());
            prop_assert_eq!(
                plan.items.iter().map(|i| i.entity_count).sum::<i64>(),
                plan.delivery.total_count_entity
            );
            prop_assert_eq!(
                plan.items.iter().map(|i| i.summ).sum::<i64>(),
                plan.delivery.total_sum
            );
        }
    }
}
