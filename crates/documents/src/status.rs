//! Per-type document status lifecycles.
//!
//! Each document type has its own closed status enum and a transition table
//! expressed as an exhaustive `match`, so adding a status without deciding its
//! edges does not compile.

use serde::{Deserialize, Serialize, Serializer};

use wareflow_core::{DomainError, DomainResult};

/// Document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Order,
    Incoming,
    Outgoing,
    Transfer,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Order => "order",
            DocumentType::Incoming => "incoming",
            DocumentType::Outgoing => "outgoing",
            DocumentType::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s.to_lowercase().as_str() {
            "order" => Ok(DocumentType::Order),
            "incoming" => Ok(DocumentType::Incoming),
            "outgoing" => Ok(DocumentType::Outgoing),
            "transfer" => Ok(DocumentType::Transfer),
            _ => Err(DomainError::validation(
                "document type must be one of: order, incoming, outgoing, transfer",
            )),
        }
    }
}

impl core::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Draft,
    InProgress,
    Completed,
    Canceled,
}

impl OrderStatus {
    /// Orders may be reopened: `Completed` and `Canceled` keep outgoing edges.
    pub fn next(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Draft => &[InProgress, Completed, Canceled],
            InProgress => &[Completed, Draft, Canceled],
            Completed => &[Draft, Canceled],
            Canceled => &[Draft, InProgress],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutgoingStatus {
    Draft,
    Reserved,
    Shipped,
    Completed,
    Canceled,
}

impl OutgoingStatus {
    pub fn next(self) -> &'static [OutgoingStatus] {
        use OutgoingStatus::*;
        match self {
            Draft => &[Reserved, Canceled],
            Reserved => &[Shipped, Canceled],
            Shipped => &[Completed, Canceled],
            Completed | Canceled => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncomingStatus {
    Draft,
    Shipped,
    TransitHub,
    InTransitDestination,
    Delivered,
    Canceled,
}

impl IncomingStatus {
    pub fn next(self) -> &'static [IncomingStatus] {
        use IncomingStatus::*;
        match self {
            Draft => &[Shipped, Canceled],
            Shipped => &[TransitHub, Canceled],
            TransitHub => &[InTransitDestination, Canceled],
            InTransitDestination => &[Delivered, Canceled],
            Delivered | Canceled => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    Draft,
    InTransit,
    Received,
    Canceled,
}

impl TransferStatus {
    pub fn next(self) -> &'static [TransferStatus] {
        use TransferStatus::*;
        match self {
            Draft => &[InTransit, Canceled],
            InTransit => &[Received, Canceled],
            Received | Canceled => &[],
        }
    }
}

/// Status of a document, tagged by the document type it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    Order(OrderStatus),
    Outgoing(OutgoingStatus),
    Incoming(IncomingStatus),
    Transfer(TransferStatus),
}

impl DocumentStatus {
    /// Initial status for a freshly created document.
    pub fn draft(doc_type: DocumentType) -> Self {
        match doc_type {
            DocumentType::Order => DocumentStatus::Order(OrderStatus::Draft),
            DocumentType::Outgoing => DocumentStatus::Outgoing(OutgoingStatus::Draft),
            DocumentType::Incoming => DocumentStatus::Incoming(IncomingStatus::Draft),
            DocumentType::Transfer => DocumentStatus::Transfer(TransferStatus::Draft),
        }
    }

    pub fn doc_type(&self) -> DocumentType {
        match self {
            DocumentStatus::Order(_) => DocumentType::Order,
            DocumentStatus::Outgoing(_) => DocumentType::Outgoing,
            DocumentStatus::Incoming(_) => DocumentType::Incoming,
            DocumentStatus::Transfer(_) => DocumentType::Transfer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Order(s) => match s {
                OrderStatus::Draft => "draft",
                OrderStatus::InProgress => "in_progress",
                OrderStatus::Completed => "completed",
                OrderStatus::Canceled => "canceled",
            },
            DocumentStatus::Outgoing(s) => match s {
                OutgoingStatus::Draft => "draft",
                OutgoingStatus::Reserved => "reserved",
                OutgoingStatus::Shipped => "shipped",
                OutgoingStatus::Completed => "completed",
                OutgoingStatus::Canceled => "canceled",
            },
            DocumentStatus::Incoming(s) => match s {
                IncomingStatus::Draft => "draft",
                IncomingStatus::Shipped => "shipped",
                IncomingStatus::TransitHub => "transit_hub",
                IncomingStatus::InTransitDestination => "in_transit_destination",
                IncomingStatus::Delivered => "delivered",
                IncomingStatus::Canceled => "canceled",
            },
            DocumentStatus::Transfer(s) => match s {
                TransferStatus::Draft => "draft",
                TransferStatus::InTransit => "in_transit",
                TransferStatus::Received => "received",
                TransferStatus::Canceled => "canceled",
            },
        }
    }

    /// Parse a status name in the context of a document type.
    pub fn parse(doc_type: DocumentType, s: &str) -> DomainResult<Self> {
        let status = match (doc_type, s) {
            (DocumentType::Order, "draft") => DocumentStatus::Order(OrderStatus::Draft),
            (DocumentType::Order, "in_progress") => DocumentStatus::Order(OrderStatus::InProgress),
            (DocumentType::Order, "completed") => DocumentStatus::Order(OrderStatus::Completed),
            (DocumentType::Order, "canceled") => DocumentStatus::Order(OrderStatus::Canceled),

            (DocumentType::Outgoing, "draft") => DocumentStatus::Outgoing(OutgoingStatus::Draft),
            (DocumentType::Outgoing, "reserved") => DocumentStatus::Outgoing(OutgoingStatus::Reserved),
            (DocumentType::Outgoing, "shipped") => DocumentStatus::Outgoing(OutgoingStatus::Shipped),
            (DocumentType::Outgoing, "completed") => DocumentStatus::Outgoing(OutgoingStatus::Completed),
            (DocumentType::Outgoing, "canceled") => DocumentStatus::Outgoing(OutgoingStatus::Canceled),

            (DocumentType::Incoming, "draft") => DocumentStatus::Incoming(IncomingStatus::Draft),
            (DocumentType::Incoming, "shipped") => DocumentStatus::Incoming(IncomingStatus::Shipped),
            (DocumentType::Incoming, "transit_hub") => DocumentStatus::Incoming(IncomingStatus::TransitHub),
            (DocumentType::Incoming, "in_transit_destination") => {
                DocumentStatus::Incoming(IncomingStatus::InTransitDestination)
            }
            (DocumentType::Incoming, "delivered") => DocumentStatus::Incoming(IncomingStatus::Delivered),
            (DocumentType::Incoming, "canceled") => DocumentStatus::Incoming(IncomingStatus::Canceled),

            (DocumentType::Transfer, "draft") => DocumentStatus::Transfer(TransferStatus::Draft),
            (DocumentType::Transfer, "in_transit") => DocumentStatus::Transfer(TransferStatus::InTransit),
            (DocumentType::Transfer, "received") => DocumentStatus::Transfer(TransferStatus::Received),
            (DocumentType::Transfer, "canceled") => DocumentStatus::Transfer(TransferStatus::Canceled),

            _ => {
                return Err(DomainError::validation(format!(
                    "unknown status '{s}' for {doc_type} documents"
                )));
            }
        };
        Ok(status)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Order(OrderStatus::Canceled)
                | DocumentStatus::Outgoing(OutgoingStatus::Canceled)
                | DocumentStatus::Incoming(IncomingStatus::Canceled)
                | DocumentStatus::Transfer(TransferStatus::Canceled)
        )
    }

    /// Business-terminal statuses. Orders in these states can still be reopened
    /// through a status change, but their lines are frozen.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Order(OrderStatus::Completed | OrderStatus::Canceled)
                | DocumentStatus::Outgoing(OutgoingStatus::Completed | OutgoingStatus::Canceled)
                | DocumentStatus::Incoming(IncomingStatus::Delivered | IncomingStatus::Canceled)
                | DocumentStatus::Transfer(TransferStatus::Received | TransferStatus::Canceled)
        )
    }

    /// Whether `to` is an outgoing edge of `self` (same document type only).
    pub fn can_transition_to(&self, to: DocumentStatus) -> bool {
        match (*self, to) {
            (DocumentStatus::Order(from), DocumentStatus::Order(to)) => from.next().contains(&to),
            (DocumentStatus::Outgoing(from), DocumentStatus::Outgoing(to)) => {
                from.next().contains(&to)
            }
            (DocumentStatus::Incoming(from), DocumentStatus::Incoming(to)) => {
                from.next().contains(&to)
            }
            (DocumentStatus::Transfer(from), DocumentStatus::Transfer(to)) => {
                from.next().contains(&to)
            }
            _ => false,
        }
    }

    /// Validate and return the target status, or `InvalidTransition`.
    pub fn transition(&self, to: DocumentStatus) -> DomainResult<DocumentStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(DomainError::invalid_transition(self, to))
        }
    }
}

impl core::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DocumentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Transition check by document type and status names.
///
/// Unknown names, or statuses that do not belong to `doc_type`, are never valid.
pub fn validate_transition(doc_type: DocumentType, from: &str, to: &str) -> bool {
    match (
        DocumentStatus::parse(doc_type, from),
        DocumentStatus::parse(doc_type, to),
    ) {
        (Ok(from), Ok(to)) => from.can_transition_to(to),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_NAMES: &[&str] = &[
        "draft",
        "in_progress",
        "completed",
        "canceled",
        "reserved",
        "shipped",
        "transit_hub",
        "in_transit_destination",
        "delivered",
        "in_transit",
        "received",
    ];

    #[test]
    fn outgoing_completed_has_no_exits() {
        for to in ALL_NAMES {
            assert!(!validate_transition(DocumentType::Outgoing, "completed", to));
        }
    }

    #[test]
    fn canceled_order_can_be_reopened() {
        assert!(validate_transition(DocumentType::Order, "canceled", "draft"));
        assert!(validate_transition(DocumentType::Order, "canceled", "in_progress"));
        assert!(!validate_transition(DocumentType::Order, "canceled", "completed"));
    }

    #[test]
    fn terminal_statuses_of_non_orders_are_closed() {
        let closed = [
            (DocumentType::Outgoing, "canceled"),
            (DocumentType::Incoming, "delivered"),
            (DocumentType::Incoming, "canceled"),
            (DocumentType::Transfer, "received"),
            (DocumentType::Transfer, "canceled"),
        ];
        for (doc_type, from) in closed {
            for to in ALL_NAMES {
                assert!(
                    !validate_transition(doc_type, from, to),
                    "{doc_type} {from} -> {to} must be rejected"
                );
            }
        }
    }

    #[test]
    fn incoming_follows_the_transit_chain() {
        let chain = ["draft", "shipped", "transit_hub", "in_transit_destination", "delivered"];
        for pair in chain.windows(2) {
            assert!(validate_transition(DocumentType::Incoming, pair[0], pair[1]));
        }
        assert!(!validate_transition(DocumentType::Incoming, "draft", "transit_hub"));
    }

    #[test]
    fn statuses_of_another_type_are_rejected() {
        assert!(!validate_transition(DocumentType::Transfer, "draft", "reserved"));
        assert!(DocumentStatus::parse(DocumentType::Transfer, "reserved").is_err());

        let from = DocumentStatus::draft(DocumentType::Outgoing);
        let to = DocumentStatus::Transfer(TransferStatus::InTransit);
        assert!(!from.can_transition_to(to));
    }

    #[test]
    fn transition_reports_both_ends() {
        let from = DocumentStatus::Transfer(TransferStatus::Received);
        let to = DocumentStatus::Transfer(TransferStatus::Draft);
        let err = from.transition(to).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "received".to_string(),
                to: "draft".to_string(),
            }
        );
    }

    #[test]
    fn every_name_parses_back_for_its_type() {
        for doc_type in [
            DocumentType::Order,
            DocumentType::Incoming,
            DocumentType::Outgoing,
            DocumentType::Transfer,
        ] {
            for name in ALL_NAMES {
                if let Ok(status) = DocumentStatus::parse(doc_type, name) {
                    assert_eq!(status.as_str(), *name);
                    assert_eq!(status.doc_type(), doc_type);
                }
            }
        }
    }
}
