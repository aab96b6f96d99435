use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use wareflow_core::BatchId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_batches))
        .route("/:id", get(get_batch))
}

/// Batches of one product, oldest receipt first.
pub async fn list_batches(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::BatchesQuery>,
) -> axum::response::Response {
    let Some(product_id) = query.product_id else {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "productId is required");
    };

    match services.batches.list_by_product(product_id).await {
        Ok(batches) => (StatusCode::OK, Json(batches)).into_response(),
        Err(e) => errors::service_error_to_response(e.into()),
    }
}

pub async fn get_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: BatchId = match errors::parse_id(&id, "batch") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.batches.get(id).await {
        Ok(Some(batch)) => (StatusCode::OK, Json(batch)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", format!("batch {id} not found")),
        Err(e) => errors::service_error_to_response(e.into()),
    }
}
