//! Imperative error handling for code outside rendering
//!
//! Event handlers and background effects cannot rely on a render boundary.
//! They report failures to an [`ErrorHandler`] instead, which logs them,
//! notifies the user and remembers the last failure for display.

mod notifier;

pub use notifier::{ChannelNotifier, Notifier, Toast, ToastVariant, TracingNotifier};

use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::debug;

use crate::error::{panic_message, ApiError};
use crate::error_log::{self, render_causes, ErrorLog, LogContext};

/// Something reported to [`ErrorHandler::handle_error`]
#[derive(Debug)]
pub enum ErrorInput {
    Message(String),
    Error(anyhow::Error),
}

impl ErrorInput {
    fn into_error(self) -> anyhow::Error {
        match self {
            ErrorInput::Message(message) => anyhow::Error::msg(message),
            ErrorInput::Error(error) => error,
        }
    }
}

impl From<&str> for ErrorInput {
    fn from(message: &str) -> Self {
        ErrorInput::Message(message.to_string())
    }
}

impl From<String> for ErrorInput {
    fn from(message: String) -> Self {
        ErrorInput::Message(message)
    }
}

impl From<anyhow::Error> for ErrorInput {
    fn from(error: anyhow::Error) -> Self {
        ErrorInput::Error(error)
    }
}

impl From<ApiError> for ErrorInput {
    fn from(error: ApiError) -> Self {
        ErrorInput::Error(error.into())
    }
}

type OnError = Arc<dyn Fn(&anyhow::Error, Option<&str>) + Send + Sync>;

#[derive(Clone)]
pub struct HandlerOptions {
    pub show_toast: bool,
    pub log_error: bool,
    pub toast_title: String,
    /// Called with the error and its id (when logged)
    pub on_error: Option<OnError>,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            show_toast: true,
            log_error: true,
            toast_title: "Error".to_string(),
            on_error: None,
        }
    }
}

impl HandlerOptions {
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&anyhow::Error, Option<&str>) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

/// Last failure seen by a handler
#[derive(Debug, Clone, Default)]
pub struct HandlerState {
    pub error: Option<Arc<anyhow::Error>>,
    pub is_error: bool,
    pub error_id: Option<String>,
}

pub struct ErrorHandler {
    options: HandlerOptions,
    state: Mutex<HandlerState>,
    // None until injected; the global log is resolved when first needed
    log: Option<Arc<ErrorLog>>,
    notifier: Arc<dyn Notifier>,
}

impl ErrorHandler {
    /// Handler reporting to the global error log and toasting through `tracing`
    pub fn new(options: HandlerOptions) -> Self {
        Self {
            options,
            state: Mutex::new(HandlerState::default()),
            log: None,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Toast and log; for request failures
    pub fn api_errors() -> Self {
        Self::new(HandlerOptions {
            toast_title: "API Error".to_string(),
            ..HandlerOptions::default()
        })
    }

    /// Toast only; validation problems are not worth a log entry
    pub fn form_errors() -> Self {
        Self::new(HandlerOptions {
            log_error: false,
            toast_title: "Validation Error".to_string(),
            ..HandlerOptions::default()
        })
    }

    /// Log only
    pub fn silent_errors() -> Self {
        Self::new(HandlerOptions {
            show_toast: false,
            ..HandlerOptions::default()
        })
    }

    pub fn with_log(mut self, log: Arc<ErrorLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn options(&self) -> &HandlerOptions {
        &self.options
    }

    /// Report a failure.
    ///
    /// Returns the error id when logging is enabled.
    pub fn handle_error(
        &self,
        input: impl Into<ErrorInput>,
        context: Option<LogContext>,
    ) -> Option<String> {
        let error = Arc::new(input.into().into_error());

        let error_id = if self.options.log_error {
            let error_id = error_log::new_error_id();
            let context = context.unwrap_or_default().extra("errorId", error_id.clone());
            self.log
                .clone()
                .unwrap_or_else(error_log::global)
                .record(error.to_string(), render_causes(&**error), context);
            Some(error_id)
        } else {
            None
        };

        if self.options.show_toast {
            self.notifier
                .notify(Toast::destructive(self.options.toast_title.clone(), error.to_string()));
        }

        *self.state.lock() = HandlerState {
            error: Some(Arc::clone(&error)),
            is_error: true,
            error_id: error_id.clone(),
        };

        if let Some(callback) = &self.options.on_error {
            callback(&*error, error_id.as_deref());
        }

        error_id
    }

    pub fn clear_error(&self) {
        *self.state.lock() = HandlerState::default();
    }

    pub fn state(&self) -> HandlerState {
        self.state.lock().clone()
    }

    pub fn is_error(&self) -> bool {
        self.state.lock().is_error
    }

    /// Run `operation`, reporting any failure or panic.
    ///
    /// The previous failure is cleared first. When `fallback_message` is
    /// given it replaces the reported message; the original error is kept as
    /// its cause.
    pub async fn handle_async_operation<T, E, F>(
        &self,
        operation: F,
        fallback_message: Option<&str>,
    ) -> Option<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        self.clear_error();

        let error = match AssertUnwindSafe(operation).catch_unwind().await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(error)) => error.into(),
            Err(payload) => anyhow::Error::msg(
                panic_message(&*payload).unwrap_or_else(|| "Operation panicked".to_string()),
            ),
        };

        debug!(error = %error, "Async operation failed");
        let error = match fallback_message {
            Some(message) => error.context(message.to_string()),
            None => error,
        };
        self.handle_error(error, None);
        None
    }
}
