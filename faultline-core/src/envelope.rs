//! Wire shape of a request outcome
//!
//! On the wire a result is `{"success": true, "data": ...}` or
//! `{"success": false, "error": {...}}`. In Rust it is [`Envelope`], a plain
//! sum type, so the two arms can never be populated at the same time.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success(T),
    Failure(ApiError),
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Envelope::Success(data) => Some(data),
            Envelope::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Envelope::Success(_) => None,
            Envelope::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> ApiResult<T> {
        self.into()
    }
}

impl<T> From<ApiResult<T>> for Envelope<T> {
    fn from(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => Envelope::Success(data),
            Err(error) => Envelope::Failure(error),
        }
    }
}

impl<T> From<Envelope<T>> for ApiResult<T> {
    fn from(envelope: Envelope<T>) -> Self {
        match envelope {
            Envelope::Success(data) => Ok(data),
            Envelope::Failure(error) => Err(error),
        }
    }
}

#[derive(Serialize)]
struct SuccessRef<'a, T> {
    success: bool,
    data: &'a T,
}

#[derive(Serialize)]
struct FailureRef<'a> {
    success: bool,
    error: &'a ApiError,
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Envelope::Success(data) => SuccessRef { success: true, data }.serialize(serializer),
            Envelope::Failure(error) => FailureRef {
                success: false,
                error,
            }
            .serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<ApiError>,
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Envelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEnvelope::deserialize(deserializer)?;
        if raw.success {
            let data = raw.data.unwrap_or(serde_json::Value::Null);
            serde_json::from_value(data)
                .map(Envelope::Success)
                .map_err(D::Error::custom)
        } else {
            raw.error
                .map(Envelope::Failure)
                .ok_or_else(|| D::Error::missing_field("error"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_success_wire_shape() {
        let envelope: Envelope<Vec<u32>> = Ok(vec![1, 2]).into();
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"success": true, "data": [1, 2]})
        );
    }

    #[test]
    fn test_failure_wire_shape() {
        let envelope: Envelope<()> = Err(ApiError::new("API key not found", 404)).into();
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": false,
                "error": {"message": "API key not found", "statusCode": 404}
            })
        );
    }

    #[test]
    fn test_failure_without_error_is_rejected() {
        let parsed = serde_json::from_value::<Envelope<u32>>(json!({"success": false}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_failure_status_is_clamped() {
        let envelope: Envelope<u32> = serde_json::from_value(json!({
            "success": false,
            "error": {"message": "odd", "statusCode": 0}
        }))
        .unwrap();
        assert_eq!(envelope.into_result().unwrap_err().status_code, 500);
    }

    #[test]
    fn test_parse_into_result() {
        let envelope: Envelope<String> =
            serde_json::from_value(json!({"success": true, "data": "ok"})).unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.into_result().unwrap(), "ok");
    }
}
