//! Delivery route planning.
//!
//! Batches outgoing documents into one delivery run: per-stop planned times,
//! merging of stops that share a destination, and read-time enrichment
//! summaries. Pure domain logic; persistence lives in `wareflow-infra`.

pub mod model;
pub mod planner;
pub mod summary;
pub mod time;

pub use model::{DeliveryDocument, DeliveryItem};
pub use planner::{ActualTime, DeliveryPatch, DeliverySchedule, RoutePlan, apply_patch, plan_route};
pub use summary::{Address, AddressSummary, Customer, CustomerSummary, DeliveryItemView, DeliveryView};
pub use time::{anchor, parse_duration, parse_time_of_day};
