//! Terminal handlers.
//!
//! # How handlers are stored
//!
//! A chain holds exactly one terminal handler behind an `Arc<dyn Handler>`,
//! shared by every concurrent request. The handler borrows the request's
//! [`Context`] for the duration of one boxed future:
//!
//! ```text
//! handler::from_fn(|ctx| Box::pin(async move { … }))   ← user writes this
//!        ↓ wrap(handler)
//! Arc::new(HandlerFn(f))                               ← BoxedHandler
//!        ↓ chain exhausted
//! handler.call(&mut ctx)                               ← one vtable dispatch
//! ```
//!
//! Plain `async fn(Request) -> impl IntoResponse` functions go through
//! [`endpoint`] instead; the returned value is written with
//! [`Context::respond`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::request::Request;
use crate::response::IntoResponse;

/// A heap-allocated, type-erased future borrowing the request context.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The innermost step of a chain: does the request-specific work.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()>;
}

/// A handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

// ── Closures over the context ────────────────────────────────────────────────

/// Turns a closure over `&mut Context` into a [`Handler`].
///
/// ```rust
/// use strand::handler;
///
/// let hello = handler::from_fn(|ctx| Box::pin(async move {
///     ctx.string("hello");
/// }));
/// ```
pub fn from_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    HandlerFn(f)
}

/// Handler returned by [`from_fn`].
pub struct HandlerFn<F>(F);

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        (self.0)(ctx)
    }
}

// ── Request → Response functions ─────────────────────────────────────────────

/// Turns `async fn(Request) -> impl IntoResponse` into a [`Handler`].
///
/// The function receives a clone of the request; its return value is
/// written to the context.
///
/// ```rust
/// use strand::{handler, Request, Response};
///
/// async fn get_user(req: Request) -> Response {
///     let id = req.param("id").unwrap_or("unknown");
///     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
/// }
///
/// let h = handler::endpoint(get_user);
/// ```
pub fn endpoint<F, Fut, R>(f: F) -> Endpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    Endpoint(f)
}

/// Handler returned by [`endpoint`].
pub struct Endpoint<F>(F);

impl<F, Fut, R> Handler for Endpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        let fut = (self.0)(ctx.request().clone());
        Box::pin(async move {
            let res = fut.await;
            ctx.respond(res);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;

    fn context() -> Context {
        let req: Request = http::Request::builder()
            .uri("/ping")
            .body(Bytes::new())
            .unwrap()
            .into();
        Context::new(req)
    }

    #[tokio::test]
    async fn from_fn_writes_through_the_context() {
        let h = from_fn(|ctx| {
            Box::pin(async move {
                let path = ctx.request().path().to_owned();
                ctx.string(&path);
            })
        });
        let mut ctx = context();
        h.call(&mut ctx).await;
        assert_eq!(ctx.response().body(), b"/ping");
    }

    #[tokio::test]
    async fn endpoint_responds_with_the_return_value() {
        async fn teapot(_req: Request) -> StatusCode {
            StatusCode::IM_A_TEAPOT
        }
        let mut ctx = context();
        endpoint(teapot).call(&mut ctx).await;
        assert_eq!(ctx.response().status_code(), StatusCode::IM_A_TEAPOT);
    }
}
