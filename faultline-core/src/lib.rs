//! Failure handling for the console
//!
//! - [`client`]: typed request client; every failure becomes an [`ApiError`]
//! - [`error`]: the error taxonomy and crate errors
//! - [`server`]: translation of handler failures into HTTP error responses
//! - [`boundary`]: render error boundaries with bounded retry
//! - [`error_log`]: bounded in-memory log with a durable mirror
//! - [`handler`]: imperative error handling with user notifications

pub mod error;
pub mod envelope;
pub mod config;
pub mod logging;
pub mod client;
pub mod error_log;
pub mod boundary;
pub mod handler;

#[cfg(feature = "server")]
pub mod server;

pub use boundary::{BoundaryLevel, ErrorBoundary, Rendered};
pub use client::{ApiClient, ClientConfig, RequestOptions};
pub use envelope::Envelope;
pub use error::{ApiError, ApiResult, ErrorCode, FaultlineError, FaultlineResult};
pub use error_log::{ErrorLog, ErrorRecord};
pub use handler::ErrorHandler;
