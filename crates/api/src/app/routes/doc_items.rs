use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{patch, post},
    Json, Router,
};

use wareflow_core::LineItemId;
use wareflow_documents::LineItemPatch;

use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(add_item))
        .route("/:id", patch(update_item).delete(remove_item))
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    ApiJson(body): ApiJson<dto::AddItemRequest>,
) -> axum::response::Response {
    match services.doc_items.add_item(body.into(), actor.user_id()).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<LineItemPatch>,
) -> axum::response::Response {
    let id: LineItemId = match errors::parse_id(&id, "line item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.doc_items.update_item(id, body, actor.user_id()).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: LineItemId = match errors::parse_id(&id, "line item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.doc_items.remove_item(id, actor.user_id()).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
