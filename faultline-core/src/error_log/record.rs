//! Error log entries and the context attached to them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where an error was observed.
///
/// Client-side observations carry the user agent and the page URL; anything
/// observed in a request handler uses `"server"` for both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub user_agent: String,
    pub url: String,
}

impl Origin {
    pub fn server() -> Self {
        Self {
            user_agent: "server".to_string(),
            url: "server".to_string(),
        }
    }

    pub fn client(user_agent: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            url: url.into(),
        }
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::server()
    }
}

/// One logged occurrence of an error. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub message: String,
    /// Rendered cause chain, outermost first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

/// Optional context supplied by the caller of [`super::ErrorLog::log`]
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    pub origin: Option<Origin>,
    pub component_stack: Option<String>,
    pub extra: Map<String, Value>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn component_stack(mut self, stack: impl Into<String>) -> Self {
        self.component_stack = Some(stack.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Render the `source()` chain below `error`, one cause per line.
pub(crate) fn render_causes(error: &(dyn std::error::Error + 'static)) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = error.source();
    while let Some(cause) = current {
        lines.push(format!("caused by: {}", cause));
        current = cause.source();
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
