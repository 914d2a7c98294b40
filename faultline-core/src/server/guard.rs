//! Handler wrapper funnelling every failure through the translator

use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use super::translator::HandlerError;

/// Wrap an async handler so that errors and panics become error responses.
///
/// The wrapped handler takes a single extractor; use a tuple for several:
///
/// ```rust,ignore
/// let route = post(with_error_handling(
///     |(Path(id), ValidatedJson(body)): (Path<String>, ValidatedJson<UpdateKey>)| async move {
///         update_key(&id, body).await
///     },
/// ));
/// ```
pub fn with_error_handling<F, Fut, Args, R>(
    handler: F,
) -> impl Fn(Args) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static
where
    F: Fn(Args) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    Args: Send + 'static,
    R: IntoResponse + Send + 'static,
{
    move |args| {
        let handler = handler.clone();
        async move {
            match AssertUnwindSafe(async move { handler(args).await })
                .catch_unwind()
                .await
            {
                Ok(Ok(output)) => output.into_response(),
                Ok(Err(error)) => error.into_response(),
                Err(payload) => HandlerError::from_panic(payload).into_response(),
            }
        }
        .boxed()
    }
}
