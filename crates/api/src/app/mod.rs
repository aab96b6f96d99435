//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: service handles built from the injected stores
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and their mapping to domain inputs
//! - `extract.rs`: JSON body extractor with API-shaped rejections
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use wareflow_infra::Stores;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(stores: &Stores) -> Router {
    let services = Arc::new(services::AppServices::new(stores));

    // Every route except the health check needs an acting user.
    let attributed = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::actor_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(attributed)
        .layer(ServiceBuilder::new())
}
