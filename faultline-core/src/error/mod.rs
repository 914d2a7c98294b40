//! Error taxonomy for Faultline
//!
//! Two families of errors live here:
//!
//! - [`ApiError`] is the wire-level taxonomy shared by the request client and
//!   the server-side translator. It carries an HTTP status, a machine-readable
//!   [`ErrorCode`] and a human message.
//! - [`FaultlineError`] covers failures of the crate's own infrastructure
//!   (configuration, files, binding a listener).
//!
//! ## Categories
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Faultline Error Taxonomy                  │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Caller-recoverable        │  Operation-terminal             │
//! │  • Validation      400     │  • Not found        404         │
//! │  • Unauthorized    401     │  • Conflict         409         │
//! │  • Forbidden       403     │  • Internal         500         │
//! │  • Rate limited    429     │                                 │
//! │  • Network         (500)   │  Render faults → boundary       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod types;
pub mod constructors;
pub mod conversions;

pub use conversions::panic_message;
pub use types::{
    is_api_error, normalize_status, ApiError, ApiResult, ErrorCategory, ErrorCode, FaultlineError, FaultlineResult,
};
