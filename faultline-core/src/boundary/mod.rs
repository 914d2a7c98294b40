//! Render error boundaries
//!
//! A boundary wraps the rendering of one subtree and isolates its failures.
//! It is a two-state machine with a bounded retry counter:
//!
//! - **Clear**: the subtree is rendered normally
//! - **Failed**: the subtree is not rendered; a fallback is shown instead
//!
//! Clear → Failed happens when the subtree returns an error or panics. The
//! boundary assigns a fresh error id, records the failure in the
//! [`ErrorLog`], calls the optional `on_error` callback and forwards an event
//! to the optional [`AnalyticsSink`]. Failed → Clear only happens through
//! [`ErrorBoundary::retry`] (or a [`ResetHandle`]), and only while
//! `retry_count < max_retries`. A retry is a plain state reset; if the defect
//! is still there the boundary fails again on the next render.
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use faultline_core::boundary::{ErrorBoundary, Rendered};
//! use faultline_core::error_log::{ErrorLog, ErrorLogConfig};
//!
//! let log = Arc::new(ErrorLog::new(ErrorLogConfig::production()));
//! let mut boundary = ErrorBoundary::component("UsageChart").with_log(log);
//!
//! let rendered = boundary.render(|| Err::<String, _>("boom"));
//! match rendered {
//!     Rendered::Fallback(fallback) => {
//!         assert_eq!(fallback.retry_label(), Some("Try Again (3 left)"));
//!     }
//!     _ => unreachable!(),
//! }
//! ```

mod fallback;
mod fault;

pub use fallback::{
    DefaultFallback, DiagnosticReport, ErrorMessage, FallbackProps, ResetHandle, RetryAction,
};
pub use fault::RenderFault;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error_log::{self, ErrorLog, LogContext};

/// Retries offered before the fallback stops showing "Try Again"
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// How much of the page a boundary protects.
///
/// Only affects the size of the default fallback and the severity reported to
/// analytics; the state machine is identical for every level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryLevel {
    Page,
    Section,
    Component,
}

impl BoundaryLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryLevel::Page => "page",
            BoundaryLevel::Section => "section",
            BoundaryLevel::Component => "component",
        }
    }

    fn fallback_title(self) -> &'static str {
        match self {
            BoundaryLevel::Page => "Something went wrong",
            BoundaryLevel::Section => "This section couldn't be loaded",
            BoundaryLevel::Component => "This component failed to render",
        }
    }

    /// Page-level failures take the whole view down
    pub fn is_fatal(self) -> bool {
        self == BoundaryLevel::Page
    }
}

impl fmt::Display for BoundaryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External analytics receiver for boundary failures
pub trait AnalyticsSink: Send + Sync {
    fn exception(&self, description: &str, fatal: bool);
}

type ErrorCallback = Box<dyn Fn(&RenderFault, &str) + Send + Sync>;

/// Snapshot of a boundary's state
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryState {
    pub has_error: bool,
    pub error: Option<Arc<RenderFault>>,
    pub error_id: Option<String>,
    pub retry_count: u32,
}

/// What a boundary produced for one render pass
#[derive(Debug)]
pub enum Rendered<V> {
    /// The subtree rendered normally
    Children(V),
    /// Output of a caller-supplied fallback renderer
    Custom(V),
    Fallback(DefaultFallback),
}

impl<V> Rendered<V> {
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Rendered::Children(_))
    }

    pub fn children(self) -> Option<V> {
        match self {
            Rendered::Children(view) => Some(view),
            _ => None,
        }
    }
}

enum Phase {
    Clear,
    Failed {
        fault: Arc<RenderFault>,
        error_id: String,
        failed_at: DateTime<Utc>,
    },
}

pub struct ErrorBoundary {
    name: String,
    level: BoundaryLevel,
    // Names of this boundary and its ancestors, innermost first
    component_path: Vec<String>,
    max_retries: u32,
    retry_count: u32,
    phase: Phase,
    reset: ResetHandle,
    // None until injected; the global log is resolved on first failure
    log: Option<Arc<ErrorLog>>,
    on_error: Option<ErrorCallback>,
    analytics: Option<Arc<dyn AnalyticsSink>>,
}

impl ErrorBoundary {
    /// Boundary reporting to the process-wide error log
    pub fn new(name: impl Into<String>, level: BoundaryLevel) -> Self {
        let name = name.into();
        Self {
            component_path: vec![name.clone()],
            name,
            level,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_count: 0,
            phase: Phase::Clear,
            reset: ResetHandle::new(),
            log: None,
            on_error: None,
            analytics: None,
        }
    }

    pub fn page(name: impl Into<String>) -> Self {
        Self::new(name, BoundaryLevel::Page)
    }

    pub fn section(name: impl Into<String>) -> Self {
        Self::new(name, BoundaryLevel::Section)
    }

    pub fn component(name: impl Into<String>) -> Self {
        Self::new(name, BoundaryLevel::Component)
    }

    /// A boundary for a subtree rendered inside this one.
    ///
    /// Shares the log and analytics sink; state is independent.
    pub fn nested(&self, name: impl Into<String>, level: BoundaryLevel) -> Self {
        let name = name.into();
        let mut component_path = vec![name.clone()];
        component_path.extend(self.component_path.iter().cloned());
        Self {
            component_path,
            log: self.log.clone(),
            analytics: self.analytics.clone(),
            ..Self::new(name, level)
        }
    }

    pub fn with_log(mut self, log: Arc<ErrorLog>) -> Self {
        self.log = Some(log);
        self
    }

    fn log(&self) -> Arc<ErrorLog> {
        self.log.clone().unwrap_or_else(error_log::global)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RenderFault, &str) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn with_analytics(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = Some(sink);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> BoundaryLevel {
        self.level
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn has_error(&self) -> bool {
        matches!(self.phase, Phase::Failed { .. })
    }

    pub fn error_id(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed { error_id, .. } => Some(error_id),
            Phase::Clear => None,
        }
    }

    pub fn state(&self) -> BoundaryState {
        match &self.phase {
            Phase::Clear => BoundaryState {
                has_error: false,
                error: None,
                error_id: None,
                retry_count: self.retry_count,
            },
            Phase::Failed { fault, error_id, .. } => BoundaryState {
                has_error: true,
                error: Some(Arc::clone(fault)),
                error_id: Some(error_id.clone()),
                retry_count: self.retry_count,
            },
        }
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn retries_left(&self) -> u32 {
        self.max_retries.saturating_sub(self.retry_count)
    }

    /// Handle for fallback renderers to request a retry
    pub fn reset_handle(&self) -> ResetHandle {
        self.reset.clone()
    }

    /// Leave the Failed state if the retry budget allows it.
    ///
    /// Returns whether the boundary is now Clear as a result of this call.
    pub fn retry(&mut self) -> bool {
        if !self.has_error() || !self.can_retry() {
            return false;
        }

        self.retry_count += 1;
        self.phase = Phase::Clear;
        debug!(
            boundary = %self.name,
            retry_count = self.retry_count,
            max_retries = self.max_retries,
            "Retrying failed subtree"
        );
        true
    }

    /// Render the subtree, falling back to the default fallback view.
    pub fn render<V, E, F>(&mut self, child: F) -> Rendered<V>
    where
        F: FnOnce() -> Result<V, E>,
        E: Into<RenderFault>,
    {
        match self.render_children(child) {
            Some(view) => Rendered::Children(view),
            None => Rendered::Fallback(self.default_fallback()),
        }
    }

    /// Render the subtree, falling back to `fallback`.
    ///
    /// A panic inside `fallback` is not caught here; it propagates to the
    /// enclosing boundary.
    pub fn render_with<V, E, F, G>(&mut self, child: F, fallback: G) -> Rendered<V>
    where
        F: FnOnce() -> Result<V, E>,
        E: Into<RenderFault>,
        G: FnOnce(&FallbackProps<'_>) -> V,
    {
        if let Some(view) = self.render_children(child) {
            return Rendered::Children(view);
        }

        match &self.phase {
            Phase::Failed { fault, error_id, .. } => {
                let props = FallbackProps {
                    error: fault,
                    error_id,
                    reset: self.reset.clone(),
                    retries_left: self.retries_left(),
                };
                Rendered::Custom(fallback(&props))
            }
            Phase::Clear => unreachable!("render_children returned no view while clear"),
        }
    }

    fn render_children<V, E, F>(&mut self, child: F) -> Option<V>
    where
        F: FnOnce() -> Result<V, E>,
        E: Into<RenderFault>,
    {
        if self.reset.take() {
            self.retry();
        }

        if self.has_error() {
            return None;
        }

        let fault = match panic::catch_unwind(AssertUnwindSafe(child)) {
            Ok(Ok(view)) => return Some(view),
            Ok(Err(error)) => error.into(),
            Err(payload) => RenderFault::from_panic(payload),
        };

        self.fail(fault);
        None
    }

    fn component_stack(&self) -> String {
        self.component_path
            .iter()
            .map(|name| format!("    at {}", name))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn fail(&mut self, fault: RenderFault) {
        let error_id = error_log::new_error_id();
        let fault = Arc::new(fault);

        warn!(
            boundary = %self.name,
            level = %self.level,
            error_id = %error_id,
            error = %fault,
            "Subtree failed to render"
        );

        self.log().record(
            fault.message().to_string(),
            fault.stack().map(str::to_string),
            LogContext::new()
                .component_stack(self.component_stack())
                .extra("errorId", error_id.clone())
                .extra("component", self.name.clone())
                .extra("level", self.level.as_str())
                .extra("retryCount", self.retry_count),
        );

        if let Some(callback) = &self.on_error {
            callback(&fault, &error_id);
        }

        if let Some(sink) = &self.analytics {
            sink.exception(
                &format!("{} ({}): {}", self.name, self.level, fault),
                self.level.is_fatal(),
            );
        }

        self.phase = Phase::Failed {
            fault,
            error_id,
            failed_at: Utc::now(),
        };
    }

    /// The built-in fallback for the current failure.
    ///
    /// # Panics
    /// Panics if the boundary is not in the Failed state.
    fn default_fallback(&self) -> DefaultFallback {
        match &self.phase {
            Phase::Failed {
                fault,
                error_id,
                failed_at,
            } => {
                let diagnostic = DiagnosticReport {
                    error_id: error_id.clone(),
                    message: fault.message().to_string(),
                    stack: fault.stack().map(str::to_string),
                    component_stack: Some(self.component_stack()),
                    timestamp: *failed_at,
                };
                DefaultFallback::new(
                    self.level,
                    diagnostic,
                    self.retries_left(),
                    self.log().environment().is_development(),
                    self.reset.clone(),
                )
            }
            Phase::Clear => unreachable!("default fallback requested while clear"),
        }
    }
}
