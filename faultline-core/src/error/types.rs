//! Core error types for Faultline
//!
//! This module contains the [`ApiError`] taxonomy value, its [`ErrorCode`]
//! and the crate-level [`FaultlineError`] enum with their result aliases.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable error identifier used for programmatic branching.
///
/// Known codes map to dedicated variants. Any other string a server sends is
/// kept verbatim in [`ErrorCode::Other`] so nothing is lost on the way through
/// the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    RateLimited,
    Internal,
    Validation,
    Network,
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::Internal => "INTERNAL_ERROR",
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::Network => "NETWORK_ERROR",
            ErrorCode::Other(code) => code,
        }
    }

    /// Taxonomy code for an HTTP status that carries no explicit code.
    pub fn for_status(status: u16) -> ErrorCode {
        match status {
            400 => ErrorCode::BadRequest,
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            409 => ErrorCode::Conflict,
            429 => ErrorCode::RateLimited,
            _ => ErrorCode::Internal,
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "BAD_REQUEST" => ErrorCode::BadRequest,
            "UNAUTHORIZED" => ErrorCode::Unauthorized,
            "FORBIDDEN" => ErrorCode::Forbidden,
            "NOT_FOUND" => ErrorCode::NotFound,
            "CONFLICT" => ErrorCode::Conflict,
            "RATE_LIMITED" => ErrorCode::RateLimited,
            "INTERNAL_ERROR" => ErrorCode::Internal,
            "VALIDATION_ERROR" => ErrorCode::Validation,
            "NETWORK_ERROR" => ErrorCode::Network,
            other => ErrorCode::Other(other.to_string()),
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        ErrorCode::from(code.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of an [`ApiError`], used to decide how a caller may
/// recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input, fixed by correcting the request
    Validation,
    /// Missing or insufficient credentials
    Authorization,
    NotFound,
    Conflict,
    /// Fixed by waiting; no built-in backoff
    RateLimited,
    /// Transport failure before any response arrived
    Network,
    /// Server fault; retrying is not assumed to be idempotent
    Internal,
}

/// Structured error value shared by the request client and the server-side
/// translator.
///
/// Serializes as `{message, statusCode, code?, details?}`. `status_code` is
/// always a valid HTTP status in `100..=599`; the constructors in
/// [`super::constructors`] fix it together with the matching [`ErrorCode`].
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase", from = "RawApiError")]
pub struct ApiError {
    /// Human-readable message
    pub message: String,
    /// HTTP status code
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    /// Opaque structured details, e.g. per-field validation issues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Wire form accepted on deserialization; the status is checked on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawApiError {
    message: String,
    status_code: i64,
    #[serde(default)]
    code: Option<ErrorCode>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

impl From<RawApiError> for ApiError {
    fn from(raw: RawApiError) -> Self {
        ApiError {
            message: raw.message,
            status_code: u16::try_from(raw.status_code)
                .map(normalize_status)
                .unwrap_or(500),
            code: raw.code,
            details: raw.details,
        }
    }
}

/// Keep `status` when it is a valid HTTP status (`100..=599`), otherwise 500.
pub fn normalize_status(status: u16) -> u16 {
    if (100..=599).contains(&status) {
        status
    } else {
        500
    }
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self.code {
            Some(ErrorCode::Network) => return ErrorCategory::Network,
            Some(ErrorCode::Validation) => return ErrorCategory::Validation,
            _ => {}
        }

        match self.status_code {
            401 | 403 => ErrorCategory::Authorization,
            404 | 410 => ErrorCategory::NotFound,
            409 => ErrorCategory::Conflict,
            429 => ErrorCategory::RateLimited,
            400..=499 => ErrorCategory::Validation,
            _ => ErrorCategory::Internal,
        }
    }

    /// Whether repeating the same call may succeed without changing it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::RateLimited
        )
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    pub fn has_code(&self, code: &ErrorCode) -> bool {
        self.code.as_ref() == Some(code)
    }

    /// Borrow the taxonomy value behind an arbitrary error, if it is one.
    pub fn from_dyn<'a>(error: &'a (dyn std::error::Error + 'static)) -> Option<&'a ApiError> {
        error.downcast_ref::<ApiError>()
    }
}

/// Distinguish taxonomy values from arbitrary errors.
pub fn is_api_error(error: &(dyn std::error::Error + 'static)) -> bool {
    ApiError::from_dyn(error).is_some()
}

/// Result of a request or handler operation in the taxonomy.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failures of Faultline's own infrastructure
#[derive(Error, Debug)]
pub enum FaultlineError {
    #[error("Configuration error in {component}: {message}")]
    ConfigurationError {
        component: String,
        message: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] Box<std::io::Error>),

    #[error("JSON error: {0}")]
    JsonError(#[from] Box<serde_json::Error>),

    #[error("Failed to parse configuration: {0}")]
    TomlError(#[from] Box<toml::de::Error>),

    #[error("Server error: {message}")]
    Server { message: String },

    #[error("Request failed: {0}")]
    Api(#[from] ApiError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type FaultlineResult<T> = std::result::Result<T, FaultlineError>;
