//! Server-side error translation
//!
//! Request handlers fail with a [`HandlerError`]; the translator maps each
//! variant to a status and an [`ErrorBody`]:
//!
//! | failure | status | code |
//! |---|---|---|
//! | schema validation | 400 | `VALIDATION_ERROR` + per-field details |
//! | taxonomy [`ApiError`](crate::ApiError) | its status | its code |
//! | anything else | 500 | `INTERNAL_ERROR` |
//!
//! [`with_error_handling`] wraps a handler so that returned errors and panics
//! both take this path, and [`with_error_layers`] adds tracing, request ids,
//! panic translation and reshaping of extractor rejections to a whole router.

mod extract;
mod guard;
mod middleware;
mod translator;

pub use extract::ValidatedJson;
pub use guard::with_error_handling;
pub use middleware::{
    request_id_middleware, route_not_found, translate_plain_errors, with_error_layers, RequestId,
    REQUEST_ID_HEADER,
};
pub use translator::{translate, ErrorBody, FieldIssue, HandlerError, ValidationFailure};

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{FaultlineError, FaultlineResult};

/// Serves a router with the error layers applied
pub struct ApiServer {
    bind_address: String,
    router: Router,
}

impl ApiServer {
    pub fn new(bind_address: impl Into<String>, router: Router) -> Self {
        Self {
            bind_address: bind_address.into(),
            router: with_error_layers(router),
        }
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// Bind the listener and serve until the process stops
    pub async fn serve(self) -> FaultlineResult<()> {
        let listener = TcpListener::bind(&self.bind_address).await.map_err(|e| {
            FaultlineError::server(format!("Failed to bind to {}: {}", self.bind_address, e))
        })?;
        Self::serve_on(listener, self.router).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(listener: TcpListener, router: Router) -> FaultlineResult<()> {
        let address = listener.local_addr()?;
        info!("Starting API server on {}", address);

        axum::serve(listener, router)
            .await
            .map_err(|e| FaultlineError::server(format!("API server error: {}", e)))
    }

    /// Start the server in a background task
    pub fn spawn(self) -> tokio::task::JoinHandle<FaultlineResult<()>> {
        tokio::spawn(async move { self.serve().await })
    }
}
