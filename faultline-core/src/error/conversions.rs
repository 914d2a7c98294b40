//! Error conversion implementations
//!
//! From trait implementations for converting external error types into
//! [`FaultlineError`] and [`ApiError`].

use std::any::Any;

use super::types::{ApiError, FaultlineError};

/// Best-effort message from a caught panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        Some((*s).to_string())
    } else {
        payload.downcast_ref::<String>().cloned()
    }
}

// System error conversions
impl From<std::io::Error> for FaultlineError {
    fn from(err: std::io::Error) -> Self {
        FaultlineError::IoError(Box::new(err))
    }
}

impl From<serde_json::Error> for FaultlineError {
    fn from(err: serde_json::Error) -> Self {
        FaultlineError::JsonError(Box::new(err))
    }
}

impl From<toml::de::Error> for FaultlineError {
    fn from(err: toml::de::Error) -> Self {
        FaultlineError::TomlError(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for FaultlineError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        FaultlineError::configuration("logging.level", err.to_string())
    }
}

// Transport failures never carry a response, so they all become NETWORK_ERROR
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::network("Request timed out")
        } else if err.is_connect() {
            ApiError::network(format!("Unable to reach server: {}", err))
        } else {
            ApiError::network(err.to_string())
        }
    }
}
