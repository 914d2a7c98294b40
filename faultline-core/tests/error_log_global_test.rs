//! Process-wide error log installation

use serial_test::serial;
use std::sync::Arc;

use faultline_core::boundary::{BoundaryLevel, ErrorBoundary};
use faultline_core::config::Environment;
use faultline_core::error_log::{self, ErrorLog, ErrorLogConfig, FileMirror, LogContext};
use faultline_core::handler::ErrorHandler;

#[test]
#[serial]
fn test_global_log_is_installed_once() {
    let dir = tempfile::tempdir().unwrap();
    let mirror = FileMirror::new(dir.path().join("errors.json"));
    let log = ErrorLog::new(ErrorLogConfig::production()).with_mirror(Box::new(mirror));

    // Components built with their own log must leave the global uninstalled
    let local = Arc::new(ErrorLog::new(ErrorLogConfig::production()));
    let mut boundary = ErrorBoundary::page("Dashboard").with_log(Arc::clone(&local));
    let mut chart = boundary.nested("UsageChart", BoundaryLevel::Component);
    assert!(chart.render(|| Err::<(), _>("chart exploded")).is_fallback());
    assert!(boundary.render(|| Ok::<_, String>(())).children().is_some());
    let handler = ErrorHandler::api_errors().with_log(Arc::clone(&local));
    assert!(handler.handle_error("request failed", None).is_some());
    assert_eq!(local.len(), 2);

    let installed = error_log::init_global(log).unwrap();
    assert!(Arc::ptr_eq(&installed, &error_log::global()));
    assert_eq!(error_log::global().environment(), Environment::Production);

    error_log::global().log_message("from the global log", LogContext::new());
    assert_eq!(installed.len(), 1);
    assert_eq!(installed.mirrored_errors()[0].message, "from the global log");

    let mut unscoped = ErrorBoundary::component("KeyList");
    assert!(unscoped.render(|| Err::<(), _>("list exploded")).is_fallback());
    assert_eq!(installed.len(), 2);

    let second = ErrorLog::new(ErrorLogConfig::development());
    assert!(error_log::init_global(second).is_err());
}
