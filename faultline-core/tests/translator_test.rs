//! Translator properties over the whole taxonomy
#![cfg(feature = "server")]

use axum::http::StatusCode;
use proptest::prelude::*;
use serde_json::json;

use faultline_core::server::{translate, FieldIssue, HandlerError, ValidationFailure};
use faultline_core::ApiError;

const TRANSLATED_STATUSES: [u16; 7] = [400, 401, 403, 404, 409, 429, 500];

fn taxonomy_error() -> impl Strategy<Value = HandlerError> {
    let message = "[a-zA-Z ]{1,24}";
    prop_oneof![
        message.prop_map(|m| HandlerError::from(ApiError::bad_request(m, None))),
        proptest::option::of(message).prop_map(|m| HandlerError::from(ApiError::unauthorized(m.as_deref()))),
        proptest::option::of(message).prop_map(|m| HandlerError::from(ApiError::forbidden(m.as_deref()))),
        message.prop_map(|m| HandlerError::from(ApiError::not_found(&m))),
        message.prop_map(|m| HandlerError::from(ApiError::conflict(m))),
        proptest::option::of(message).prop_map(|m| HandlerError::from(ApiError::too_many_requests(m.as_deref()))),
        proptest::option::of(message).prop_map(|m| HandlerError::from(ApiError::internal(m.as_deref()))),
        message.prop_map(|m| HandlerError::Internal(anyhow::Error::msg(m))),
        proptest::collection::vec(("[a-z]{1,8}", message), 1..4).prop_map(|fields| {
            HandlerError::Validation(ValidationFailure::new(
                fields
                    .into_iter()
                    .map(|(field, message)| FieldIssue {
                        path: vec![field],
                        message,
                    })
                    .collect(),
            ))
        }),
    ]
}

proptest! {
    #[test]
    fn prop_status_is_in_taxonomy_and_code_is_present(error in taxonomy_error()) {
        let (status, body) = translate(&error);
        prop_assert!(TRANSLATED_STATUSES.contains(&status.as_u16()));
        prop_assert!(body.code.is_some());
        prop_assert!(!body.error.is_empty());
    }
}

#[test]
fn test_webhook_not_found_body() {
    let (status, body) = translate(&ApiError::not_found("Webhook").into());
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        serde_json::to_value(&body).unwrap(),
        json!({ "error": "Webhook not found", "code": "NOT_FOUND" })
    );
}
