use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use wareflow_core::{ProductId, WarehouseId};

use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/reserve", post(reserve))
        .route("/:product_id/:warehouse_id", get(get_stock))
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path((product_id, warehouse_id)): Path<(String, String)>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&product_id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let warehouse_id: WarehouseId = match errors::parse_id(&warehouse_id, "warehouse") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger.stock_level(product_id, warehouse_id).await {
        Ok(level) => (StatusCode::OK, Json(level)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn reserve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    ApiJson(body): ApiJson<dto::ReserveRequest>,
) -> axum::response::Response {
    match services
        .ledger
        .reserve(&body.items, body.warehouse_id, actor.user_id())
        .await
    {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
