use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use wareflow_core::DeliveryId;
use wareflow_delivery::DeliveryPatch;

use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_deliveries).post(create_delivery))
        .route(
            "/:id",
            get(get_delivery).patch(update_delivery).delete(delete_delivery),
        )
}

pub async fn list_deliveries(
    Extension(services): Extension<Arc<AppServices>>,
    Query(range): Query<dto::DeliveryRangeQuery>,
) -> axum::response::Response {
    match services
        .deliveries
        .get_doc_deliveries(range.start_date, range.end_date)
        .await
    {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    ApiJson(body): ApiJson<dto::CreateDeliveryRequest>,
) -> axum::response::Response {
    match services.deliveries.create_delivery(body.into(), actor.user_id()).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DeliveryId = match errors::parse_id(&id, "delivery") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.deliveries.get_delivery(id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<DeliveryPatch>,
) -> axum::response::Response {
    let id: DeliveryId = match errors::parse_id(&id, "delivery") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.deliveries.update_delivery(id, body).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DeliveryId = match errors::parse_id(&id, "delivery") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.deliveries.delete_delivery(id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
