//! Request extractors

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use super::translator::{HandlerError, ValidationFailure};
use crate::error::ApiError;

/// JSON body that has passed schema validation.
///
/// A body that is not JSON is rejected as `400 BAD_REQUEST`. A body that
/// parses but has the wrong shape, or fails validation, is rejected as
/// `400 VALIDATION_ERROR` with one detail entry per failed field.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                ApiError::bad_request(format!("Invalid JSON: {}", rejection.body_text()), None)
            })?;

        let value: T = serde_path_to_error::deserialize(body).map_err(ValidationFailure::from)?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}
