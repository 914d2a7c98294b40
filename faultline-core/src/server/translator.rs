//! Translation of handler failures into HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serde_path_to_error::Segment;
use std::any::Any;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::error::{normalize_status, panic_message, ApiError, ErrorCode};

/// Wire body of every error response: `{error, code?, details?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// One failed field of a request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub path: Vec<String>,
    pub message: String,
}

impl FieldIssue {
    /// Dotted field path, e.g. `events.0.url`
    pub fn field(&self) -> String {
        self.path.join(".")
    }
}

/// Schema validation failure, flattened to one issue per field error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    pub issues: Vec<FieldIssue>,
}

impl ValidationFailure {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    pub fn details(&self) -> Value {
        Value::Array(
            self.issues
                .iter()
                .map(|issue| json!({ "field": issue.field(), "message": issue.message }))
                .collect(),
        )
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self.issues.iter().map(FieldIssue::field).collect();
        write!(f, "Validation failed: {}", fields.join(", "))
    }
}

impl From<&ValidationErrors> for ValidationFailure {
    fn from(errors: &ValidationErrors) -> Self {
        let mut issues = Vec::new();
        collect_issues(errors, &mut Vec::new(), &mut issues);
        issues.sort_by(|a, b| a.path.cmp(&b.path));
        Self { issues }
    }
}

fn collect_issues(errors: &ValidationErrors, prefix: &mut Vec<String>, issues: &mut Vec<FieldIssue>) {
    for (field, kind) in errors.errors() {
        prefix.push(field.to_string());
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for field_error in field_errors {
                    let message = field_error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", field_error.code));
                    issues.push(FieldIssue {
                        path: prefix.clone(),
                        message,
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_issues(nested, prefix, issues),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    prefix.push(index.to_string());
                    collect_issues(nested, prefix, issues);
                    prefix.pop();
                }
            }
        }
        prefix.pop();
    }
}

/// A JSON body that parsed but does not fit the target type
impl From<serde_path_to_error::Error<serde_json::Error>> for ValidationFailure {
    fn from(error: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let mut path: Vec<String> = error
            .path()
            .iter()
            .filter_map(|segment| match segment {
                Segment::Seq { index } => Some(index.to_string()),
                Segment::Map { key } => Some(key.clone()),
                Segment::Enum { variant } => Some(variant.clone()),
                Segment::Unknown => None,
            })
            .collect();

        let message = error.inner().to_string();
        if let Some(field) = missing_field(&message) {
            path.push(field.to_string());
        }

        Self::new(vec![FieldIssue { path, message }])
    }
}

/// Field named by serde's "missing field `x`" message
fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")?
        .split('`')
        .next()
        .filter(|field| !field.is_empty())
}

/// Every way a request handler can fail
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{0}")]
    Validation(ValidationFailure),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HandlerError {
    /// A panic caught while running a handler
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = panic_message(&*payload).unwrap_or_else(|| "Internal server error".to_string());
        HandlerError::Internal(anyhow::Error::msg(message))
    }
}

impl From<ValidationFailure> for HandlerError {
    fn from(failure: ValidationFailure) -> Self {
        HandlerError::Validation(failure)
    }
}

impl From<ValidationErrors> for HandlerError {
    fn from(errors: ValidationErrors) -> Self {
        HandlerError::Validation(ValidationFailure::from(&errors))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(error: serde_json::Error) -> Self {
        HandlerError::Internal(error.into())
    }
}

/// Map a handler failure to its status and body.
pub fn translate(error: &HandlerError) -> (StatusCode, ErrorBody) {
    match error {
        HandlerError::Validation(failure) => (
            StatusCode::BAD_REQUEST,
            ErrorBody {
                error: "Validation failed".to_string(),
                code: Some(ErrorCode::Validation.to_string()),
                details: Some(failure.details()),
            },
        ),
        HandlerError::Api(api) => {
            let status = StatusCode::from_u16(normalize_status(api.status_code))
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let code = api
                .code
                .clone()
                .unwrap_or_else(|| ErrorCode::for_status(status.as_u16()));
            (
                status,
                ErrorBody {
                    error: api.message.clone(),
                    code: Some(code.to_string()),
                    details: api.details.clone(),
                },
            )
        }
        HandlerError::Internal(internal) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody {
                error: internal.to_string(),
                code: Some(ErrorCode::Internal.to_string()),
                details: None,
            },
        ),
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let (status, body) = translate(&self);

        if status.is_server_error() {
            error!(error = ?self, status = %status, "Request handler failed");
        } else {
            warn!(error = %self, status = %status, code = ?body.code, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}
