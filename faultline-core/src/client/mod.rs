//! Typed request client
//!
//! [`ApiClient`] issues one HTTP request per call and never lets a transport
//! or HTTP failure escape as anything other than an [`ApiError`]:
//!
//! - transport failures (offline, DNS, timeout, broken body) become
//!   `NETWORK_ERROR` with status 500
//! - non-2xx responses become an [`ApiError`] built from the JSON error body
//!   (`error`, `statusCode`, `code`, `details`), defaulting the status to the
//!   HTTP status
//! - 2xx responses are decoded as JSON into the caller's type
//!
//! There are no retries at this layer. Concurrent calls are independent.

mod options;

pub use options::RequestOptions;

use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult, ErrorCode, FaultlineError, FaultlineResult};

/// Environment variable consulted when no base URL is configured
pub const BASE_URL_ENV: &str = "FAULTLINE_API_URL";

/// Base URL used when neither configuration nor environment provide one
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Request client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Falls back to `FAULTLINE_API_URL`, then [`DEFAULT_BASE_URL`]
    pub base_url: Option<String>,
    /// Whole-request timeout; expiry is reported as a network error
    pub timeout: Option<Duration>,
    /// Extra default headers sent with every call
    pub default_headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Some(Duration::from_secs(30)),
            default_headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    fn resolve_base_url(&self) -> String {
        self.base_url
            .clone()
            .or_else(|| std::env::var(BASE_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    default_headers: RwLock<HeaderMap>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> FaultlineResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| {
            FaultlineError::configuration("client", format!("Failed to build HTTP client: {}", e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &config.default_headers {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }

        Ok(Self {
            http,
            base_url: config.resolve_base_url(),
            default_headers: RwLock::new(headers),
        })
    }

    /// Client using the base URL from the environment
    pub fn from_env() -> FaultlineResult<Self> {
        Self::new(ClientConfig::default())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `Authorization: Bearer <token>` with every subsequent call.
    pub fn set_auth_token(&self, token: &str) -> FaultlineResult<()> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| FaultlineError::configuration("auth_token", e.to_string()))?;
        self.default_headers.write().insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Remove the bearer header, leaving other defaults untouched.
    pub fn clear_auth_token(&self) {
        self.default_headers.write().remove(AUTHORIZATION);
    }

    pub fn set_header(&self, name: &str, value: &str) -> FaultlineResult<()> {
        let (name, value) = parse_header(name, value)?;
        self.default_headers.write().insert(name, value);
        Ok(())
    }

    pub fn remove_header(&self, name: &str) {
        self.default_headers.write().remove(name);
    }

    /// Snapshot of the current default headers
    pub fn default_headers(&self) -> HeaderMap {
        self.default_headers.read().clone()
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Issue one request and resolve to a typed result.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ApiResult<T> {
        let url = self.url_for(path);
        let mut headers = self.default_headers();
        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        debug!(method = %options.method, %url, "Sending request");

        let mut builder = self.http.request(options.method.clone(), &url).headers(headers);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = options.body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = %options.method, %url, error = %e, "Request failed before a response was received");
                return Err(e.into());
            }
        };

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            // The status is authoritative; an unreadable body parses as `{}`.
            let body = match response.bytes().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(%url, status, error = %e, "Failed to read error response body");
                    Default::default()
                }
            };
            let error = error_from_body(status, &body);
            debug!(%url, status, code = ?error.code, "Request returned an error status");
            return Err(error);
        }

        let body = response.bytes().await.map_err(|e| {
            warn!(%url, status, error = %e, "Failed to read response body");
            ApiError::from(e)
        })?;
        decode_body(&body)
    }

    /// Same as [`ApiClient::request`], shaped as the wire envelope.
    pub async fn request_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Envelope<T> {
        self.request(path, options).await.into()
    }

    /// `GET` with URL-encoded query parameters appended
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<T> {
        let options = query
            .iter()
            .fold(RequestOptions::new(Method::GET), |options, (k, v)| {
                options.query(*k, *v)
            });
        self.request(path, options).await
    }

    pub async fn post<T, B>(&self, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(path, with_body(Method::POST, body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(path, with_body(Method::PUT, body)?).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(path, with_body(Method::PATCH, body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(path, RequestOptions::new(Method::DELETE)).await
    }
}

fn with_body<B: Serialize + ?Sized>(method: Method, body: Option<&B>) -> ApiResult<RequestOptions> {
    let options = RequestOptions::new(method);
    match body {
        Some(body) => options.json(body),
        None => Ok(options),
    }
}

fn parse_header(name: &str, value: &str) -> FaultlineResult<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| FaultlineError::configuration("client.headers", e.to_string()))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| FaultlineError::configuration("client.headers", format!("{}: {}", name, e)))?;
    Ok((header_name, header_value))
}

/// Build the taxonomy value for a non-2xx response.
///
/// Bodies that are not JSON objects are treated as `{}`.
fn error_from_body(status: u16, body: &[u8]) -> ApiError {
    let parsed = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .filter(|value| value.is_object())
        .unwrap_or_else(|| serde_json::json!({}));

    let message = parsed
        .get("error")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status {}", status));

    let status_code = parsed
        .get("statusCode")
        .and_then(|v| v.as_u64())
        .and_then(|v| u16::try_from(v).ok())
        .unwrap_or(status);

    let mut error = ApiError::new(message, status_code);
    error.code = parsed
        .get("code")
        .and_then(|v| v.as_str())
        .map(ErrorCode::from);
    error.details = parsed.get("details").filter(|v| !v.is_null()).cloned();
    error
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    let decoded = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(serde_json::Value::Null)
    } else {
        serde_json::from_slice(body)
    };
    decoded.map_err(|e| ApiError::network(format!("Invalid response body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(ClientConfig::with_base_url(base)).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let client = client("http://localhost:3000/api/");
        assert_eq!(client.url_for("/keys"), "http://localhost:3000/api/keys");
        assert_eq!(client.url_for("keys"), "http://localhost:3000/api/keys");
        assert_eq!(client.url_for("https://other.example/x"), "https://other.example/x");
    }

    #[test]
    fn test_auth_token_leaves_other_defaults() {
        let client = client("http://localhost");
        client.set_header("X-Console", "1").unwrap();
        client.set_auth_token("secret-token").unwrap();
        assert_eq!(
            client.default_headers().get(AUTHORIZATION).unwrap(),
            "Bearer secret-token"
        );

        client.clear_auth_token();
        let headers = client.default_headers();
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers.get("x-console").unwrap(), "1");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_error_from_body_fields() {
        let body = br#"{"error":"Name taken","statusCode":409,"code":"CONFLICT","details":{"field":"name"}}"#;
        let error = error_from_body(400, body);
        assert_eq!(error.message, "Name taken");
        assert_eq!(error.status_code, 409);
        assert_eq!(error.code, Some(ErrorCode::Conflict));
        assert_eq!(error.details, Some(serde_json::json!({"field": "name"})));
    }

    #[test]
    fn test_error_from_unparseable_body() {
        let error = error_from_body(502, b"<html>Bad Gateway</html>");
        assert_eq!(error.status_code, 502);
        assert_eq!(error.message, "Request failed with status 502");
        assert_eq!(error.code, None);
        assert_eq!(error.details, None);
    }

    #[test]
    fn test_empty_body_decodes_as_null() {
        let unit: () = decode_body(b"").unwrap();
        assert_eq!(unit, ());
        let none: Option<u32> = decode_body(b"  ").unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_invalid_success_body_is_network_error() {
        let result: ApiResult<Vec<u32>> = decode_body(b"{not json");
        assert_eq!(result.unwrap_err().code, Some(ErrorCode::Network));
    }
}
