//! Bounded, dual-sink error log
//!
//! Every observed error becomes an [`ErrorRecord`] appended to an in-memory
//! ring of at most [`MAX_ERRORS`] entries (oldest evicted first). In
//! production each record is also written through to a [`DurableMirror`]
//! holding at most [`MAX_DURABLE_ERRORS`]; mirror failures are swallowed so a
//! broken side channel can never feed back into the log. In development the
//! mirror is skipped and records are emitted immediately through `tracing`.
//!
//! A process-wide instance is available through [`global`]; boundaries and
//! handlers accept an injected `Arc<ErrorLog>` as well.

mod mirror;
mod record;

pub use mirror::{DurableMirror, FileMirror, MemoryMirror};
pub use record::{ErrorRecord, LogContext, Origin};
pub(crate) use record::render_causes;

use chrono::Utc;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Environment;
use crate::error::{FaultlineError, FaultlineResult};

/// In-memory ring capacity
pub const MAX_ERRORS: usize = 100;

/// Durable mirror capacity
pub const MAX_DURABLE_ERRORS: usize = 50;

/// Number of records returned by [`ErrorLog::get_recent_errors`]
pub const RECENT_ERRORS: usize = 10;

/// Identifier for one error occurrence: `error_<unix millis>_<9 base36 chars>`
pub fn new_error_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("error_{}_{}", Utc::now().timestamp_millis(), suffix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorLogConfig {
    pub environment: Environment,
    pub capacity: usize,
    pub durable_capacity: usize,
}

impl Default for ErrorLogConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            capacity: MAX_ERRORS,
            durable_capacity: MAX_DURABLE_ERRORS,
        }
    }
}

impl ErrorLogConfig {
    pub fn from_env() -> Self {
        Self {
            environment: Environment::from_env(),
            ..Self::default()
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            ..Self::default()
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            ..Self::default()
        }
    }
}

pub struct ErrorLog {
    config: ErrorLogConfig,
    origin: Origin,
    errors: Mutex<VecDeque<ErrorRecord>>,
    mirror: Box<dyn DurableMirror>,
}

impl ErrorLog {
    /// Create a log backed by an in-memory mirror
    pub fn new(config: ErrorLogConfig) -> Self {
        Self {
            config,
            origin: Origin::server(),
            errors: Mutex::new(VecDeque::with_capacity(config.capacity)),
            mirror: Box::new(MemoryMirror::new()),
        }
    }

    pub fn with_mirror(mut self, mirror: Box<dyn DurableMirror>) -> Self {
        self.mirror = mirror;
        self
    }

    /// Origin stamped on records whose context does not name one
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn config(&self) -> &ErrorLogConfig {
        &self.config
    }

    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    /// Record `error` and return the stored record.
    pub fn log(&self, error: &(dyn std::error::Error + 'static), context: LogContext) -> ErrorRecord {
        self.record(error.to_string(), render_causes(error), context)
    }

    /// Record a failure known only by its message.
    pub fn log_message(&self, message: impl Into<String>, context: LogContext) -> ErrorRecord {
        self.record(message.into(), None, context)
    }

    pub(crate) fn record(&self, message: String, stack: Option<String>, context: LogContext) -> ErrorRecord {
        let origin = context.origin.unwrap_or_else(|| self.origin.clone());
        let record = ErrorRecord {
            message,
            stack,
            timestamp: Utc::now(),
            user_agent: origin.user_agent,
            url: origin.url,
            component_stack: context.component_stack,
            extra: if context.extra.is_empty() {
                None
            } else {
                Some(context.extra)
            },
        };

        {
            let mut errors = self.errors.lock();
            errors.push_back(record.clone());
            while errors.len() > self.config.capacity {
                errors.pop_front();
            }
        }

        if self.config.environment.is_development() {
            error!(
                message = %record.message,
                timestamp = %record.timestamp,
                url = %record.url,
                stack = ?record.stack,
                component_stack = ?record.component_stack,
                extra = ?record.extra,
                "Error logged"
            );
        } else {
            // Best effort: a failing mirror must not produce more errors
            let _ = self.mirror.append(&record, self.config.durable_capacity);
        }

        record
    }

    /// The most recent records, oldest first.
    pub fn get_recent_errors(&self) -> Vec<ErrorRecord> {
        let errors = self.errors.lock();
        let skip = errors.len().saturating_sub(RECENT_ERRORS);
        errors.iter().skip(skip).cloned().collect()
    }

    pub fn all_errors(&self) -> Vec<ErrorRecord> {
        self.errors.lock().iter().cloned().collect()
    }

    /// Records held by the durable mirror; empty if it cannot be read.
    pub fn mirrored_errors(&self) -> Vec<ErrorRecord> {
        self.mirror.load().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }

    /// Empty both the ring and the durable mirror.
    pub fn clear_errors(&self) {
        self.errors.lock().clear();
        let _ = self.mirror.clear();
    }

    /// Fire-and-forget performance diagnostic; emitted only in development.
    pub fn log_performance(&self, metric: &str, value: f64, metadata: Option<&serde_json::Value>) {
        if self.config.environment.is_development() {
            info!(metric, value, metadata = ?metadata, "Performance metric");
        }
    }
}

static GLOBAL: OnceCell<Arc<ErrorLog>> = OnceCell::new();

/// Install the process-wide log.
///
/// # Errors
/// Returns an error if the global log was already created, either by an
/// earlier `init_global` or by a call to [`global`].
pub fn init_global(log: ErrorLog) -> FaultlineResult<Arc<ErrorLog>> {
    let log = Arc::new(log);
    GLOBAL
        .set(Arc::clone(&log))
        .map_err(|_| FaultlineError::configuration("error_log", "Global error log already initialized"))?;
    Ok(log)
}

/// The process-wide log, created from the environment on first use.
pub fn global() -> Arc<ErrorLog> {
    GLOBAL
        .get_or_init(|| Arc::new(ErrorLog::new(ErrorLogConfig::from_env())))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn production() -> ErrorLog {
        ErrorLog::new(ErrorLogConfig::production())
    }

    struct FailingMirror {
        attempts: AtomicUsize,
    }

    impl DurableMirror for FailingMirror {
        fn append(&self, _record: &ErrorRecord, _capacity: usize) -> FaultlineResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(FaultlineError::internal("quota exceeded"))
        }

        fn clear(&self) -> FaultlineResult<()> {
            Err(FaultlineError::internal("quota exceeded"))
        }

        fn load(&self) -> FaultlineResult<Vec<ErrorRecord>> {
            Err(FaultlineError::internal("quota exceeded"))
        }
    }

    #[test]
    fn test_log_builds_record() {
        let log = production();
        let record = log.log(
            &ApiError::conflict("Key name taken"),
            LogContext::new()
                .component_stack("in KeyList")
                .extra("action", "create_key"),
        );

        assert_eq!(record.message, "Key name taken");
        assert_eq!(record.user_agent, "server");
        assert_eq!(record.component_stack.as_deref(), Some("in KeyList"));
        assert_eq!(record.extra.unwrap()["action"], "create_key");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_recent_errors_are_last_ten_in_order() {
        let log = production();
        for n in 0..25 {
            log.log_message(format!("error {}", n), LogContext::new());
        }

        let recent = log.get_recent_errors();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].message, "error 15");
        assert_eq!(recent[9].message, "error 24");
    }

    #[test]
    fn test_production_mirrors_with_smaller_cap() {
        let log = production();
        for n in 0..120 {
            log.log_message(format!("error {}", n), LogContext::new());
        }

        assert_eq!(log.len(), MAX_ERRORS);
        let mirrored = log.mirrored_errors();
        assert_eq!(mirrored.len(), MAX_DURABLE_ERRORS);
        assert_eq!(mirrored[0].message, "error 70");
    }

    #[test]
    fn test_development_skips_mirror() {
        let log = ErrorLog::new(ErrorLogConfig::development());
        log.log_message("dev only", LogContext::new());
        assert_eq!(log.len(), 1);
        assert!(log.mirrored_errors().is_empty());
    }

    #[test]
    fn test_mirror_failures_are_swallowed() {
        let log = production().with_mirror(Box::new(FailingMirror {
            attempts: AtomicUsize::new(0),
        }));

        log.log_message("first", LogContext::new());
        log.log_message("second", LogContext::new());
        log.clear_errors();

        assert!(log.is_empty());
        assert!(log.mirrored_errors().is_empty());
    }

    #[test]
    fn test_clear_empties_both_sinks() {
        let log = production();
        log.log_message("gone soon", LogContext::new());
        log.clear_errors();
        assert!(log.is_empty());
        assert!(log.mirrored_errors().is_empty());
    }

    #[test]
    fn test_default_origin_and_override() {
        let log = production().with_origin(Origin::client("faultline-cli/0.1", "https://console/keys"));
        let record = log.log_message("x", LogContext::new());
        assert_eq!(record.url, "https://console/keys");

        let record = log.log_message("y", LogContext::new().origin(Origin::server()));
        assert_eq!(record.url, "server");
    }

    #[test]
    fn test_error_ids_are_distinct() {
        let a = new_error_id();
        let b = new_error_id();
        assert_ne!(a, b);
        assert!(a.starts_with("error_"));
        assert_eq!(a.rsplit('_').next().unwrap().len(), 9);
    }

    proptest! {
        #[test]
        fn prop_ring_never_exceeds_capacity(count in 0usize..400) {
            let log = production();
            for n in 0..count {
                log.log_message(format!("error {}", n), LogContext::new());
            }

            prop_assert_eq!(log.len(), count.min(MAX_ERRORS));
            if count > 0 {
                let all = log.all_errors();
                let first_kept = count.saturating_sub(MAX_ERRORS);
                prop_assert_eq!(&all[0].message, &format!("error {}", first_kept));
                prop_assert_eq!(&all[all.len() - 1].message, &format!("error {}", count - 1));
            }
        }
    }
}
