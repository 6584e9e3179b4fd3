//! Event handler abstraction.
//!
//! # Design Decisions
//! - Handlers return a boxed future so they can be stored as trait objects
//!   in the registry and swapped at runtime
//! - Any error type converts into [`HandlerError`]; the bridge maps it to 500
//! - Blocking handlers run on the blocking pool and cannot be interrupted

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::event::{Event, Reply};

/// Error returned by a failing handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Future produced by [`EventHandler::handle`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, HandlerError>> + Send>>;

/// Processes an event and produces its reply.
pub trait EventHandler: Send + Sync + 'static {
    fn handle(&self, event: Arc<Event>) -> HandlerFuture;
}

impl<H: EventHandler + ?Sized> EventHandler for Arc<H> {
    fn handle(&self, event: Arc<Event>) -> HandlerFuture {
        (**self).handle(event)
    }
}

/// Handler built from an async closure. See [`handler_fn`].
#[derive(Clone)]
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure as an [`EventHandler`].
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
{
    FnHandler { f }
}

impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
{
    fn handle(&self, event: Arc<Event>) -> HandlerFuture {
        Box::pin((self.f)(event))
    }
}

/// Handler running synchronous code on the blocking pool. See
/// [`blocking_handler_fn`].
pub struct BlockingHandler<F> {
    f: Arc<F>,
}

/// Wrap a synchronous closure as an [`EventHandler`] run via `spawn_blocking`.
///
/// Once started, a blocking handler runs to completion even if the request
/// times out or the bridge stops.
pub fn blocking_handler_fn<F>(f: F) -> BlockingHandler<F>
where
    F: Fn(&Event) -> Result<Reply, HandlerError> + Send + Sync + 'static,
{
    BlockingHandler { f: Arc::new(f) }
}

impl<F> EventHandler for BlockingHandler<F>
where
    F: Fn(&Event) -> Result<Reply, HandlerError> + Send + Sync + 'static,
{
    fn handle(&self, event: Arc<Event>) -> HandlerFuture {
        let f = Arc::clone(&self.f);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || f(&event))
                .await
                .map_err(|err| Box::new(err) as HandlerError)?
        })
    }
}

/// Replies with the request's own headers and body.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl EventHandler for EchoHandler {
    fn handle(&self, event: Arc<Event>) -> HandlerFuture {
        Box::pin(async move {
            Ok(Reply {
                status: 200,
                headers: event.headers.clone(),
                body: event.body.clone(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::RequestId;
    use crate::event::{EnvelopeBuilder, RawRequest};
    use axum::http::{header, HeaderValue, Method};

    fn event() -> Arc<Event> {
        let raw = RawRequest::new(Method::POST, "/echo".parse().unwrap())
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_body("hello");
        Arc::new(EnvelopeBuilder::new().build(raw, RequestId::from("1-1")))
    }

    #[tokio::test]
    async fn echo_returns_headers_and_body() {
        let reply = EchoHandler.handle(event()).await.unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.headers.get_all("content-type").unwrap(), ["text/plain"]);
        assert_eq!(reply.headers.len(), 1);
        assert_eq!(reply.body, b"hello");
    }

    #[tokio::test]
    async fn closure_handler() {
        let handler = handler_fn(|event: Arc<Event>| async move {
            Ok::<_, HandlerError>(Reply::ok(format!("path={}", event.path)))
        });
        let reply = handler.handle(event()).await.unwrap();
        assert_eq!(reply.body, b"path=/echo");
    }

    #[tokio::test]
    async fn blocking_handler_errors_propagate() {
        let handler = blocking_handler_fn(|_event: &Event| Err("disk on fire".into()));
        let err = handler.handle(event()).await.unwrap_err();
        assert_eq!(err.to_string(), "disk on fire");
    }

    #[tokio::test]
    async fn blocking_handler_panic_becomes_error() {
        let handler = blocking_handler_fn(|_event: &Event| -> Result<Reply, HandlerError> {
            panic!("boom")
        });
        assert!(handler.handle(event()).await.is_err());
    }
}
