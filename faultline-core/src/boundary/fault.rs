//! Failures raised while rendering a subtree

use std::any::Any;
use thiserror::Error;

use crate::error::{panic_message, ApiError};
use crate::error_log::render_causes;

/// A rendering failure captured by a boundary.
///
/// Subtrees report failures either by returning `Err` or by panicking; both
/// end up here.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct RenderFault {
    message: String,
    stack: Option<String>,
    panicked: bool,
}

impl RenderFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
            panicked: false,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Capture an arbitrary error with its cause chain as the stack.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            message: error.to_string(),
            stack: render_causes(error),
            panicked: false,
        }
    }

    /// Best-effort message from a panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self {
            message: panic_message(&*payload).unwrap_or_else(|| "Unknown render failure".to_string()),
            stack: None,
            panicked: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Whether the subtree panicked rather than returning an error
    pub fn is_panic(&self) -> bool {
        self.panicked
    }
}

impl From<anyhow::Error> for RenderFault {
    fn from(error: anyhow::Error) -> Self {
        RenderFault::from_error(&*error)
    }
}

impl From<ApiError> for RenderFault {
    fn from(error: ApiError) -> Self {
        RenderFault::from_error(&error)
    }
}

impl From<String> for RenderFault {
    fn from(message: String) -> Self {
        RenderFault::new(message)
    }
}

impl From<&str> for RenderFault {
    fn from(message: &str) -> Self {
        RenderFault::new(message)
    }
}
