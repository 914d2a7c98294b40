//! Per-call request options

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

/// Options for a single [`super::ApiClient::request`] call.
///
/// Headers set here take precedence over the client's default headers.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ApiResult<Self> {
        let encoded = serde_json::to_vec(body).map_err(|e| {
            ApiError::internal(Some(&format!("Failed to encode request body: {}", e)))
        })?;
        self.body = Some(encoded);
        Ok(self)
    }

    pub fn query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header; names or values that are not valid HTTP are rejected.
    pub fn header(mut self, name: &str, value: &str) -> ApiResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ApiError::bad_request(format!("Invalid header name '{}': {}", name, e), None)
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ApiError::bad_request(format!("Invalid header value for '{}': {}", name, e), None)
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }
}
