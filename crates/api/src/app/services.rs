use std::sync::Arc;

use wareflow_infra::store::{BatchStore, TransactionLogStore};
use wareflow_infra::{
    DeliveryRouteBuilder, DocItemCoordinator, DocumentService, InventoryLedger, Stores,
};

/// Services shared by all handlers.
#[derive(Clone)]
pub struct AppServices {
    pub documents: DocumentService,
    pub doc_items: DocItemCoordinator,
    pub ledger: InventoryLedger,
    pub deliveries: DeliveryRouteBuilder,
    pub transactions: Arc<dyn TransactionLogStore>,
    pub batches: Arc<dyn BatchStore>,
}

impl AppServices {
    pub fn new(stores: &Stores) -> Self {
        Self {
            documents: DocumentService::new(stores),
            doc_items: DocItemCoordinator::new(stores),
            ledger: InventoryLedger::new(stores),
            deliveries: DeliveryRouteBuilder::new(stores),
            transactions: stores.transactions.clone(),
            batches: stores.batches.clone(),
        }
    }
}
