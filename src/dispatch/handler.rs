//! Versioned handler abstraction.
//!
//! A handler is anything that can be invoked with the request and its
//! negotiated [`RequestVersionContext`] and produce a response. Closures
//! returning any `IntoResponse` qualify through the blanket impl.

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;

use crate::dispatch::context::RequestVersionContext;

/// Future returned by a handler invocation.
pub type HandlerFuture = BoxFuture<'static, Response>;

/// Capability: invoke with request + context, produce a response.
pub trait VersionedHandler: Send + Sync + 'static {
    fn call(&self, request: Request<Body>, context: RequestVersionContext) -> HandlerFuture;
}

impl<F, Fut, R> VersionedHandler for F
where
    F: Fn(Request<Body>, RequestVersionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, request: Request<Body>, context: RequestVersionContext) -> HandlerFuture {
        let fut = self(request, context);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Shared, type-erased handler stored in a binding.
pub type BoxedHandler = Arc<dyn VersionedHandler>;

/// Box a handler for storage in a [`RouteBinding`](crate::routing::RouteBinding).
pub fn handler_fn<H: VersionedHandler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}
