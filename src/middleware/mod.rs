//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: access logging, panic recovery, authentication
//! and anything else that wraps the terminal handler.
//!
//! A middleware receives the request [`Context`] and a [`Next`]
//! continuation. It may:
//!
//! - work, call `next.run(ctx).await`, then work some more (wrap style);
//! - call [`Context::stop`] and return without running `next` (short circuit);
//! - drop `next` without stopping, which silently ends the chain.
//!
//! ```rust
//! use http::StatusCode;
//! use strand::middleware;
//!
//! let auth = middleware::from_fn(|ctx, next| Box::pin(async move {
//!     if ctx.request().header("authorization").is_none() {
//!         ctx.code(StatusCode::UNAUTHORIZED);
//!         ctx.stop();
//!         return;
//!     }
//!     next.run(ctx).await;
//! }))
//! .named("auth");
//! ```
//!
//! Built-in middleware:
//! - [`PanicRecovery`] — turns a panic anywhere inside it into a logged `500`
//! - [`Logger`] — one INFO access record per request
//! - [`PathInterceptor`] — applies a middleware under a path prefix only

use std::sync::Arc;

use crate::context::Context;
use crate::handler::BoxFuture;

mod logger;
mod path;
mod recovery;

pub use crate::chain::Next;
pub use logger::{Attr, Field, Logger, LoggerOptions};
pub use path::PathInterceptor;
pub use recovery::PanicRecovery;

/// What a middleware is for, as far as chain validation is concerned.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    /// Any ordinary middleware.
    Interceptor,
    /// Contains panics from everything it wraps. A chain accepts at most
    /// one, and it must be added last.
    Recovery,
}

/// A composable interceptor around request processing.
pub trait Middleware: Send + Sync + 'static {
    fn serve<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, ()>;

    /// Name used in diagnostics. Defaults to the implementing type's name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn role(&self) -> Role {
        Role::Interceptor
    }
}

/// A middleware shared across concurrent requests.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Turns a closure into a [`Middleware`]. Give it a name with
/// [`FnMiddleware::named`]; otherwise the closure's type name is used.
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    FnMiddleware { name: None, f }
}

/// Middleware returned by [`from_fn`].
pub struct FnMiddleware<F> {
    name: Option<&'static str>,
    f: F,
}

impl<F> FnMiddleware<F> {
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn serve<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, ()> {
        (self.f)(ctx, next)
    }

    fn name(&self) -> &str {
        self.name.unwrap_or_else(std::any::type_name::<F>)
    }
}
