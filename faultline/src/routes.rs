//! Demo console API
//!
//! An in-memory stand-in for the console backend: API keys, webhooks and a
//! usage summary. Every handler is wrapped by the error translator so the
//! client side sees the same `{error, code, details}` bodies a real backend
//! would send.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use faultline_core::server::{with_error_handling, HandlerError, ValidatedJson};
use faultline_core::ApiError;

const MAX_USAGE_DAYS: u32 = 90;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    pub url: String,
    pub events: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateKey {
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWebhook {
    #[validate(url(message = "Invalid URL"))]
    pub url: String,
    #[validate(length(min = 1, message = "At least one event is required"))]
    pub events: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub since: DateTime<Utc>,
    pub days: u32,
    pub requests: u64,
}

#[derive(Default)]
pub struct ConsoleState {
    keys: RwLock<Vec<ApiKey>>,
    webhooks: RwLock<Vec<Webhook>>,
}

pub type AppState = Arc<ConsoleState>;

fn new_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &id[..12])
}

async fn list_keys(state: AppState) -> Result<Json<Vec<ApiKey>>, HandlerError> {
    Ok(Json(state.keys.read().clone()))
}

async fn get_key(state: AppState, id: String) -> Result<Json<ApiKey>, HandlerError> {
    state
        .keys
        .read()
        .iter()
        .find(|key| key.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("API key").into())
}

async fn create_key(
    state: AppState,
    request: CreateKey,
) -> Result<(StatusCode, Json<ApiKey>), HandlerError> {
    let mut keys = state.keys.write();
    if keys.iter().any(|key| key.name == request.name) {
        return Err(ApiError::conflict(format!("An API key named '{}' already exists", request.name)).into());
    }

    let key = ApiKey {
        id: new_id("key"),
        name: request.name,
        created_at: Utc::now(),
    };
    info!(key_id = %key.id, "Created API key");
    keys.push(key.clone());
    Ok((StatusCode::CREATED, Json(key)))
}

async fn delete_key(state: AppState, id: String) -> Result<StatusCode, HandlerError> {
    let mut keys = state.keys.write();
    let before = keys.len();
    keys.retain(|key| key.id != id);
    if keys.len() == before {
        return Err(ApiError::not_found("API key").into());
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_webhooks(state: AppState) -> Result<Json<Vec<Webhook>>, HandlerError> {
    Ok(Json(state.webhooks.read().clone()))
}

async fn create_webhook(
    state: AppState,
    request: CreateWebhook,
) -> Result<(StatusCode, Json<Webhook>), HandlerError> {
    let webhook = Webhook {
        id: new_id("wh"),
        url: request.url,
        events: request.events,
        created_at: Utc::now(),
    };
    state.webhooks.write().push(webhook.clone());
    Ok((StatusCode::CREATED, Json(webhook)))
}

async fn usage(query: UsageQuery) -> Result<Json<UsageSummary>, HandlerError> {
    let days = query.days.unwrap_or(7);
    if days == 0 || days > MAX_USAGE_DAYS {
        return Err(ApiError::bad_request(
            format!("days must be between 1 and {}", MAX_USAGE_DAYS),
            Some(serde_json::json!({ "param": "days", "value": days })),
        )
        .into());
    }

    Ok(Json(UsageSummary {
        since: Utc::now() - Duration::days(i64::from(days)),
        days,
        requests: u64::from(days) * 1_250,
    }))
}

async fn explode() -> Result<Json<()>, HandlerError> {
    panic!("Simulated handler crash");
}

/// Router for the demo console API, without the error layers
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/keys",
            get(with_error_handling(|State(state): State<AppState>| list_keys(state))).post(
                with_error_handling(
                    |(State(state), ValidatedJson(request)): (State<AppState>, ValidatedJson<CreateKey>)| {
                        create_key(state, request)
                    },
                ),
            ),
        )
        .route(
            "/api/keys/:id",
            get(with_error_handling(
                |(State(state), Path(id)): (State<AppState>, Path<String>)| get_key(state, id),
            ))
            .delete(with_error_handling(
                |(State(state), Path(id)): (State<AppState>, Path<String>)| delete_key(state, id),
            )),
        )
        .route(
            "/api/webhooks",
            get(with_error_handling(|State(state): State<AppState>| list_webhooks(state))).post(
                with_error_handling(
                    |(State(state), ValidatedJson(request)): (
                        State<AppState>,
                        ValidatedJson<CreateWebhook>,
                    )| create_webhook(state, request),
                ),
            ),
        )
        .route(
            "/api/usage",
            get(with_error_handling(|Query(query): Query<UsageQuery>| usage(query))),
        )
        .route("/api/debug/panic", get(with_error_handling(|_: axum::http::Method| explode())))
        .route("/api/health", get(|| async { Json(serde_json::json!({ "status": "ok" })) }))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use faultline_core::server::with_error_layers;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn app() -> Router {
        with_error_layers(router(AppState::default()))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_key_lifecycle() {
        let app = app();

        let (status, created) = send(&app, json_request("POST", "/api/keys", json!({ "name": "ci" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, fetched) = send(&app, get_request(&format!("/api/keys/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "ci");

        let (status, body) = send(&app, json_request("POST", "/api/keys", json!({ "name": "ci" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/keys/{}", id))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, get_request(&format!("/api/keys/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "API key not found", "code": "NOT_FOUND" }));
    }

    #[tokio::test]
    async fn test_webhook_validation() {
        let app = app();
        let (status, body) = send(
            &app,
            json_request("POST", "/api/webhooks", json!({ "url": "nope", "events": [] })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(
            body["details"],
            json!([
                { "field": "events", "message": "At least one event is required" },
                { "field": "url", "message": "Invalid URL" },
            ])
        );
    }

    #[tokio::test]
    async fn test_usage_range() {
        let app = app();
        let (status, body) = send(&app, get_request("/api/usage?days=30")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requests"], 37_500);

        let (status, body) = send(&app, get_request("/api/usage?days=365")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["param"], "days");
    }

    #[tokio::test]
    async fn test_unparseable_query_is_translated() {
        let (status, body) = send(&app(), get_request("/api/usage?days=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["error"].as_str().unwrap().contains("invalid digit"));
    }

    #[tokio::test]
    async fn test_wrong_body_shape_is_validation_error() {
        let app = app();
        let (status, body) = send(&app, json_request("POST", "/api/keys", json!({ "name": 5 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["details"][0]["field"], "name");

        let (status, body) = send(&app, json_request("POST", "/api/keys", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["details"],
            json!([{ "field": "name", "message": "missing field `name`" }])
        );
    }

    #[tokio::test]
    async fn test_panicking_handler() {
        let (status, body) = send(&app(), get_request("/api/debug/panic")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Simulated handler crash", "code": "INTERNAL_ERROR" }));
    }
}
