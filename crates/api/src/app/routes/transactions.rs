use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(find_transactions))
}

/// Exactly one of `productId`, `batchId` or `userId` selects the log slice.
pub async fn find_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::TransactionsQuery>,
) -> axum::response::Response {
    let log = &services.transactions;
    let found = match (query.product_id, query.batch_id, query.user_id) {
        (Some(product_id), None, None) => log.find_by_product(product_id).await,
        (None, Some(batch_id), None) => log.find_by_batch(batch_id).await,
        (None, None, Some(user_id)) => log.find_by_user(user_id).await,
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "give exactly one of productId, batchId, userId",
            );
        }
    };

    match found {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => errors::service_error_to_response(e.into()),
    }
}
