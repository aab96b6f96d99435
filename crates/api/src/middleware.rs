use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use wareflow_core::UserId;

use crate::app::errors::json_error;
use crate::context::ActorContext;

pub const USER_HEADER: &str = "x-user-id";

pub async fn actor_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let user_id = extract_user(req.headers())?;
    req.extensions_mut().insert(ActorContext::new(user_id));
    Ok(next.run(req).await)
}

fn extract_user(headers: &HeaderMap) -> Result<UserId, Response> {
    let header = headers.get(USER_HEADER).ok_or_else(|| {
        json_error(StatusCode::UNAUTHORIZED, "missing_user", "X-User-Id header is required")
    })?;

    let raw = header
        .to_str()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_user", "X-User-Id is not valid text"))?;

    raw.trim()
        .parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_user", "X-User-Id must be a UUID"))
}
