//! Read-side enrichment of delivery stops.

use serde::{Deserialize, Serialize};

use wareflow_core::{AddressId, CustomerId, Entity};

use crate::model::{DeliveryDocument, DeliveryItem};

/// Destination address (reference data owned elsewhere).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub address: String,
    pub phone: Option<String>,
}

impl Entity for Address {
    type Id = AddressId;

    fn id(&self) -> AddressId {
        self.id
    }
}

/// Customer (reference data owned elsewhere).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> CustomerId {
        self.id
    }
}

/// Embedded address fields. Missing references yield empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSummary {
    pub id: String,
    pub address: String,
    pub phone: String,
}

impl From<Option<&Address>> for AddressSummary {
    fn from(address: Option<&Address>) -> Self {
        match address {
            Some(a) => Self {
                id: a.id.to_string(),
                address: a.address.clone(),
                phone: a.phone.clone().unwrap_or_default(),
            },
            None => Self::default(),
        }
    }
}

/// Embedded customer fields. Missing references yield empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl From<Option<&Customer>> for CustomerSummary {
    fn from(customer: Option<&Customer>) -> Self {
        match customer {
            Some(c) => Self {
                id: c.id.to_string(),
                name: c.name.clone(),
                address: c.address.clone().unwrap_or_default(),
                phone: c.phone.clone().unwrap_or_default(),
            },
            None => Self::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryItemView {
    #[serde(flatten)]
    pub item: DeliveryItem,
    pub address: AddressSummary,
    pub customer: CustomerSummary,
}

impl DeliveryItemView {
    pub fn new(item: DeliveryItem, address: Option<&Address>, customer: Option<&Customer>) -> Self {
        Self {
            item,
            address: address.into(),
            customer: customer.into(),
        }
    }
}

/// A delivery run with its enriched stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryView {
    pub delivery_doc: DeliveryDocument,
    pub delivery_items: Vec<DeliveryItemView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_references_become_empty_placeholders() {
        let a = AddressSummary::from(None);
        assert_eq!(a.id, "");
        assert_eq!(a.address, "");
        assert_eq!(a.phone, "");

        let c = CustomerSummary::from(None);
        assert_eq!(c, CustomerSummary::default());
    }

    #[test]
    fn present_references_are_summarized() {
        let address = Address {
            id: AddressId::new(),
            address: "1 Dock Road".to_string(),
            phone: None,
        };
        let summary = AddressSummary::from(Some(&address));
        assert_eq!(summary.id, address.id.to_string());
        assert_eq!(summary.address, "1 Dock Road");
        assert_eq!(summary.phone, "");
    }
}
