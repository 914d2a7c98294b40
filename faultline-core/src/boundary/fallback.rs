//! Fallback views shown in place of a failed subtree

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::fault::RenderFault;
use super::BoundaryLevel;
use crate::error::FaultlineResult;

/// Requests a retry of the boundary that handed it out.
///
/// The request is applied on the boundary's next `render` call, subject to
/// the same retry limit as [`super::ErrorBoundary::retry`].
#[derive(Debug, Clone, Default)]
pub struct ResetHandle {
    requested: Arc<AtomicBool>,
}

impl ResetHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub(crate) fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

/// What a caller-supplied fallback renderer receives
#[derive(Debug)]
pub struct FallbackProps<'a> {
    pub error: &'a RenderFault,
    pub error_id: &'a str,
    pub reset: ResetHandle,
    pub retries_left: u32,
}

/// Payload of the "copy diagnostic" action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    pub error_id: String,
    pub message: String,
    pub stack: Option<String>,
    pub component_stack: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticReport {
    pub fn to_clipboard_json(&self) -> FaultlineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAction {
    pub label: String,
    pub remaining: u32,
}

/// Built-in fallback, sized by the boundary level
#[derive(Debug, Clone)]
pub struct DefaultFallback {
    pub level: BoundaryLevel,
    pub title: &'static str,
    pub message: String,
    pub error_id: String,
    /// `None` once the retry budget is spent
    pub retry: Option<RetryAction>,
    /// Only populated in development
    pub stack: Option<String>,
    pub reset: ResetHandle,
    diagnostic: DiagnosticReport,
}

impl DefaultFallback {
    pub(crate) fn new(
        level: BoundaryLevel,
        diagnostic: DiagnosticReport,
        retries_left: u32,
        show_stack: bool,
        reset: ResetHandle,
    ) -> Self {
        let retry = (retries_left > 0).then(|| RetryAction {
            label: format!("Try Again ({} left)", retries_left),
            remaining: retries_left,
        });

        Self {
            level,
            title: level.fallback_title(),
            message: diagnostic.message.clone(),
            error_id: diagnostic.error_id.clone(),
            retry,
            stack: if show_stack {
                diagnostic.stack.clone()
            } else {
                None
            },
            reset,
            diagnostic,
        }
    }

    pub fn retry_label(&self) -> Option<&str> {
        self.retry.as_ref().map(|r| r.label.as_str())
    }

    pub fn diagnostic(&self) -> &DiagnosticReport {
        &self.diagnostic
    }
}

impl fmt::Display for DefaultFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", self.message)?;
        write!(f, "Error ID: {}", self.error_id)?;
        if let Some(retry) = &self.retry {
            write!(f, "\n[ {} ]", retry.label)?;
        }
        if let Some(stack) = &self.stack {
            write!(f, "\n{}", stack)?;
        }
        Ok(())
    }
}

/// Stateless rendering of an error that was never raised, e.g. a failed
/// fetch kept in local state.
pub struct ErrorMessage {
    pub title: String,
    pub message: String,
    on_retry: Option<Box<dyn Fn() + Send + Sync>>,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            message: message.into(),
            on_retry: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_retry = Some(Box::new(callback));
        self
    }

    pub fn has_retry(&self) -> bool {
        self.on_retry.is_some()
    }

    /// Invoke the retry callback; returns false when there is none.
    pub fn retry(&self) -> bool {
        match &self.on_retry {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)?;
        if self.has_retry() {
            write!(f, " [ Retry ]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn report() -> DiagnosticReport {
        DiagnosticReport {
            error_id: "error_1_abc".to_string(),
            message: "boom".to_string(),
            stack: Some("caused by: x".to_string()),
            component_stack: Some("at UsageChart".to_string()),
            timestamp: "2026-10-18T12:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_clipboard_payload_keys() {
        let json: serde_json::Value =
            serde_json::from_str(&report().to_clipboard_json().unwrap()).unwrap();
        for key in ["errorId", "message", "stack", "componentStack", "timestamp"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_stack_hidden_outside_development() {
        let fallback = DefaultFallback::new(BoundaryLevel::Page, report(), 3, false, ResetHandle::new());
        assert!(fallback.stack.is_none());
        assert_eq!(fallback.diagnostic().stack.as_deref(), Some("caused by: x"));
        assert!(!fallback.to_string().contains("caused by"));
    }

    #[test]
    fn test_message_shown_at_every_level() {
        for level in [BoundaryLevel::Page, BoundaryLevel::Section, BoundaryLevel::Component] {
            let fallback = DefaultFallback::new(level, report(), 2, false, ResetHandle::new());
            let text = fallback.to_string();
            assert!(text.starts_with(level.fallback_title()), "{}", text);
            assert!(text.lines().any(|line| line == "boom"), "{}", text);
        }
    }

    #[test]
    fn test_exhausted_fallback_has_no_retry() {
        let fallback = DefaultFallback::new(BoundaryLevel::Section, report(), 0, true, ResetHandle::new());
        assert!(fallback.retry.is_none());
        assert!(!fallback.to_string().contains("Try Again"));
    }

    #[test]
    fn test_error_message_retry_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let message = ErrorMessage::new("Failed to load webhooks").on_retry(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(message.to_string(), "Error: Failed to load webhooks [ Retry ]");
        assert!(message.retry());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!ErrorMessage::new("plain").retry());
    }
}
