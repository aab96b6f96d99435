//! Infrastructure layer: stores, sagas, services and configuration.

pub mod config;
pub mod coordinator;
pub mod delivery;
pub mod documents;
pub mod error;
pub mod ledger;
pub mod recalculator;
pub mod saga;
pub mod store;


pub use config::{AppConfig, ConfigError};
pub use coordinator::DocItemCoordinator;
pub use delivery::{DeliveryRouteBuilder, NewDelivery};
pub use documents::DocumentService;
pub use error::{ServiceError, ServiceResult};
pub use ledger::{InventoryLedger, StockLevel};
pub use recalculator::DocSumRecalculator;
pub use store::{StoreError, StoreResult, Stores, apply_schema};
