use axum::Router;

pub mod batches;
pub mod delivery;
pub mod doc_items;
pub mod documents;
pub mod inventory;
pub mod system;
pub mod transactions;

/// Router for all attributed (acting-user) endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/doc-items", doc_items::router())
        .nest("/documents", documents::router())
        .nest("/delivery", delivery::router())
        .nest("/inventory", inventory::router())
        .nest("/batches", batches::router())
        .nest("/transactions", transactions::router())
}
