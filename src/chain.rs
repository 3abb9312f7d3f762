//! The execution engine.
//!
//! A [`Chain`] owns the ordered middleware list and the terminal handler and
//! is shared, read-only, by every request. The per-request cursor travels in
//! the [`Next`] continuation handed to each middleware, so a fresh request
//! always starts from the top and no reset is ever needed.
//!
//! # Order
//!
//! Middlewares run in the REVERSE of insertion order. For insertion order
//! `[m0, m1, m2]`:
//!
//! ```text
//! m2 before → m1 before → m0 before → handler → m0 after → m1 after → m2 after
//! ```
//!
//! The last-added middleware is the outermost wrapper, which is where a
//! [`PanicRecovery`](crate::middleware::PanicRecovery) belongs.
//!
//! # Stop
//!
//! [`Context::stop`] is checked before the first step and at the top of every
//! continuation. It never interrupts code already running.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

use crate::context::Context;
use crate::handler::{BoxFuture, BoxedHandler};
use crate::middleware::BoxedMiddleware;

pub(crate) struct Chain {
    middlewares: Vec<BoxedMiddleware>,
    handler: BoxedHandler,
}

impl Chain {
    pub(crate) fn new(middlewares: Vec<BoxedMiddleware>, handler: BoxedHandler) -> Self {
        Self { middlewares, handler }
    }

    /// Runs the chain for one request.
    pub(crate) async fn exec(&self, ctx: &mut Context) {
        if ctx.is_stopped() {
            return;
        }
        match self.middlewares.len() {
            0 => self.handler.call(ctx).await,
            n => self.serve(ctx, n - 1).await,
        }
    }

    fn serve<'a>(&'a self, ctx: &'a mut Context, cursor: usize) -> BoxFuture<'a, ()> {
        let middleware = &self.middlewares[cursor];
        trace!(middleware = middleware.name(), cursor, "serving middleware");
        middleware.serve(ctx, Next { chain: self, cursor, entered: None })
    }
}

/// Continuation handed to a middleware: resumes the chain.
///
/// [`run`](Next::run) consumes the continuation, so the rest of the chain
/// can be entered at most once per middleware. Dropping it without running
/// halts the chain silently; the terminal handler never runs.
pub struct Next<'a> {
    chain: &'a Chain,
    /// Position of the middleware that received this continuation.
    cursor: usize,
    /// Set when [`run`](Next::run) is called.
    entered: Option<&'a AtomicBool>,
}

impl<'a> Next<'a> {
    /// Runs the next middleware, or the terminal handler once every
    /// middleware has been entered. Does nothing if the context is stopped.
    pub fn run<'b>(self, ctx: &'b mut Context) -> BoxFuture<'b, ()>
    where
        'a: 'b,
    {
        if let Some(entered) = self.entered {
            entered.store(true, Ordering::Relaxed);
        }
        Box::pin(async move {
            if ctx.is_stopped() {
                return;
            }
            match self.cursor.checked_sub(1) {
                Some(cursor) => self.chain.serve(ctx, cursor).await,
                None => self.chain.handler.call(ctx).await,
            }
        })
    }

    /// A second continuation to the same position, for middlewares that must
    /// resume the chain when a delegate did not. Never exposed: together the
    /// two could advance the chain twice.
    pub(crate) fn fork(&self) -> Next<'a> {
        Next { chain: self.chain, cursor: self.cursor, entered: None }
    }

    /// This continuation, reporting into `entered` when it is run.
    pub(crate) fn watched<'b>(self, entered: &'b AtomicBool) -> Next<'b>
    where
        'a: 'b,
    {
        Next { chain: self.chain, cursor: self.cursor, entered: Some(entered) }
    }
}
