//! Middleware shared by every route

use axum::{
    body::to_bytes,
    extract::Request,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue, Uri,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use std::any::Any;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::translator::HandlerError;
use crate::error::{ApiError, ErrorCode};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID carried in request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Propagate or assign an `x-request-id` and echo it on the response
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

const PLAIN_ERROR_BODY_LIMIT: usize = 64 * 1024;

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |content_type| content_type.starts_with("application/json"))
}

/// Re-shape error responses that bypassed the translator, such as extractor
/// rejections, into `{error, code}` bodies
pub async fn translate_plain_errors(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let text = to_bytes(body, PLAIN_ERROR_BODY_LIMIT)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default();
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("Request failed").to_string()
    } else {
        text
    };
    let code = match ErrorCode::for_status(status.as_u16()) {
        ErrorCode::Internal if status.is_client_error() => ErrorCode::BadRequest,
        code => code,
    };

    let mut translated =
        HandlerError::from(ApiError::new(message, status.as_u16()).with_code(code)).into_response();
    for (name, value) in parts.headers.iter() {
        if *name != CONTENT_TYPE && *name != CONTENT_LENGTH && !translated.headers().contains_key(name) {
            translated.headers_mut().insert(name.clone(), value.clone());
        }
    }
    translated
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    HandlerError::from_panic(payload).into_response()
}

/// Fallback for unmatched routes
pub async fn route_not_found(uri: Uri) -> HandlerError {
    ApiError::not_found(&format!("Route {}", uri.path())).into()
}

/// Add tracing, panic translation and request ids to `router`.
///
/// Panics escaping handlers not wrapped by
/// [`with_error_handling`](super::with_error_handling) still produce a
/// translated `500 INTERNAL_ERROR` body, and plain-text rejections from
/// extractors (bad query strings, path parameters) are re-shaped into the
/// same `{error, code}` body.
pub fn with_error_layers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.fallback(route_not_found).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(axum::middleware::from_fn(request_id_middleware))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(axum::middleware::from_fn(translate_plain_errors)),
    )
}
