//! Named constructors for the error taxonomy
//!
//! Each constructor fixes the status code and [`ErrorCode`] of one failure
//! class and only takes the human-facing parts.

use super::types::{normalize_status, ApiError, ErrorCode, FaultlineError};

impl ApiError {
    /// Create an error with an explicit status and no code.
    ///
    /// Statuses outside `100..=599` are replaced by 500.
    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        ApiError {
            message: message.into(),
            status_code: normalize_status(status_code),
            code: None,
            details: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<ErrorCode>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// 400 `BAD_REQUEST`, optionally carrying structured details
    ///
    /// # Examples
    /// ```rust
    /// use faultline_core::error::{ApiError, ErrorCode};
    ///
    /// let err = ApiError::bad_request("Missing name", None);
    /// assert_eq!(err.status_code, 400);
    /// assert_eq!(err.code, Some(ErrorCode::BadRequest));
    /// ```
    pub fn bad_request(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        ApiError {
            message: message.into(),
            status_code: 400,
            code: Some(ErrorCode::BadRequest),
            details,
        }
    }

    /// 401 `UNAUTHORIZED`
    pub fn unauthorized(message: Option<&str>) -> Self {
        ApiError::new(message.unwrap_or("Unauthorized"), 401).with_code(ErrorCode::Unauthorized)
    }

    /// 403 `FORBIDDEN`
    pub fn forbidden(message: Option<&str>) -> Self {
        ApiError::new(message.unwrap_or("Forbidden"), 403).with_code(ErrorCode::Forbidden)
    }

    /// 404 `NOT_FOUND` with the message `"<resource> not found"`
    ///
    /// # Examples
    /// ```rust
    /// use faultline_core::error::ApiError;
    ///
    /// let err = ApiError::not_found("Webhook");
    /// assert_eq!(err.message, "Webhook not found");
    /// assert_eq!(err.status_code, 404);
    /// ```
    pub fn not_found(resource: &str) -> Self {
        ApiError::new(format!("{} not found", resource), 404).with_code(ErrorCode::NotFound)
    }

    /// 409 `CONFLICT`
    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::new(message, 409).with_code(ErrorCode::Conflict)
    }

    /// 429 `RATE_LIMITED`
    pub fn too_many_requests(message: Option<&str>) -> Self {
        ApiError::new(message.unwrap_or("Too many requests"), 429)
            .with_code(ErrorCode::RateLimited)
    }

    /// 500 `INTERNAL_ERROR`
    pub fn internal(message: Option<&str>) -> Self {
        ApiError::new(message.unwrap_or("Internal server error"), 500)
            .with_code(ErrorCode::Internal)
    }

    /// Transport-level failure: no response was received.
    ///
    /// Shaped like an internal error (500) but tagged `NETWORK_ERROR`.
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::new(message, 500).with_code(ErrorCode::Network)
    }

    /// 400 `VALIDATION_ERROR` with per-field details
    pub fn validation(details: serde_json::Value) -> Self {
        ApiError::new("Validation failed", 400)
            .with_code(ErrorCode::Validation)
            .with_details(details)
    }
}

impl FaultlineError {
    /// Create a configuration error with component and message
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        FaultlineError::ConfigurationError {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        FaultlineError::Server {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        FaultlineError::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{is_api_error, ErrorCategory};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_constructor_table() {
        let cases = vec![
            (ApiError::bad_request("bad", None), 400, "BAD_REQUEST"),
            (ApiError::unauthorized(None), 401, "UNAUTHORIZED"),
            (ApiError::forbidden(None), 403, "FORBIDDEN"),
            (ApiError::not_found("Key"), 404, "NOT_FOUND"),
            (ApiError::conflict("taken"), 409, "CONFLICT"),
            (ApiError::too_many_requests(None), 429, "RATE_LIMITED"),
            (ApiError::internal(None), 500, "INTERNAL_ERROR"),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.status_code, status);
            assert_eq!(error.code.as_ref().map(|c| c.as_str()), Some(code));
        }
    }

    #[test]
    fn test_not_found_webhook() {
        let err = ApiError::not_found("Webhook");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "Webhook not found",
                "statusCode": 404,
                "code": "NOT_FOUND"
            })
        );
    }

    #[test]
    fn test_default_messages() {
        assert_eq!(ApiError::unauthorized(None).message, "Unauthorized");
        assert_eq!(ApiError::forbidden(Some("Admins only")).message, "Admins only");
        assert_eq!(ApiError::internal(None).message, "Internal server error");
    }

    #[test]
    fn test_bad_request_details() {
        let err = ApiError::bad_request("bad", Some(serde_json::json!({"field": "name"})));
        assert_eq!(err.details, Some(serde_json::json!({"field": "name"})));
    }

    #[test]
    fn test_out_of_range_status_is_clamped() {
        assert_eq!(ApiError::new("weird", 42).status_code, 500);
        assert_eq!(ApiError::new("weird", 600).status_code, 500);
        assert_eq!(ApiError::new("teapot", 418).status_code, 418);
    }

    #[test]
    fn test_deserialized_status_is_clamped() {
        let decode = |status: serde_json::Value| -> ApiError {
            serde_json::from_value(serde_json::json!({ "message": "odd", "statusCode": status }))
                .unwrap()
        };
        assert_eq!(decode(serde_json::json!(700)).status_code, 500);
        assert_eq!(decode(serde_json::json!(0)).status_code, 500);
        assert_eq!(decode(serde_json::json!(-1)).status_code, 500);
        assert_eq!(decode(serde_json::json!(70000)).status_code, 500);
        assert_eq!(decode(serde_json::json!(503)).status_code, 503);
    }

    #[test]
    fn test_categories() {
        assert_eq!(ApiError::network("offline").category(), ErrorCategory::Network);
        assert_eq!(ApiError::forbidden(None).category(), ErrorCategory::Authorization);
        assert_eq!(ApiError::too_many_requests(None).category(), ErrorCategory::RateLimited);
        assert_eq!(ApiError::internal(None).category(), ErrorCategory::Internal);
        assert!(ApiError::network("offline").is_retryable());
        assert!(!ApiError::internal(None).is_retryable());
        assert!(ApiError::conflict("x").is_client_error());
    }

    #[test]
    fn test_type_predicate() {
        let api = ApiError::conflict("duplicate");
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(is_api_error(&api));
        assert!(!is_api_error(&io));
    }

    #[test]
    fn test_unknown_code_round_trips_verbatim() {
        let err: ApiError = serde_json::from_value(serde_json::json!({
            "message": "quota",
            "statusCode": 402,
            "code": "PAYMENT_REQUIRED"
        }))
        .unwrap();
        assert_eq!(err.code, Some(ErrorCode::Other("PAYMENT_REQUIRED".to_string())));
        assert_eq!(serde_json::to_value(&err).unwrap()["code"], "PAYMENT_REQUIRED");
    }
}
