use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};

use wareflow_core::DocumentId;

use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_documents).post(create_document))
        .route("/:id", get(get_document))
        .route("/:id/items", get(get_line_items))
        .route("/:id/status", patch(change_status))
}

pub async fn create_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    ApiJson(body): ApiJson<dto::CreateDocumentRequest>,
) -> axum::response::Response {
    let new = match body.into_new_document() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.documents.create_document(new, actor.user_id()).await {
        Ok(doc) => (StatusCode::CREATED, Json(doc)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_documents(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::DocumentsQuery>,
) -> axum::response::Response {
    let filter = match query.into_filter() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.documents.list_documents(&filter).await {
        Ok(docs) => (StatusCode::OK, Json(docs)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_document(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DocumentId = match errors::parse_id(&id, "document") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.documents.get_document(id).await {
        Ok(doc) => (StatusCode::OK, Json(doc)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_line_items(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DocumentId = match errors::parse_id(&id, "document") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.documents.line_items(id).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::ChangeStatusRequest>,
) -> axum::response::Response {
    let id: DocumentId = match errors::parse_id(&id, "document") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.documents.change_status(id, &body.status, actor.user_id()).await {
        Ok(doc) => (StatusCode::OK, Json(doc)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
