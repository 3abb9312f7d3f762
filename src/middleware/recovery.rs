//! Panic recovery.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::StatusCode;
use tracing::{Dispatch, error};

use super::{Middleware, Next, Role};
use crate::context::Context;
use crate::handler::BoxFuture;
use crate::log;

/// Recovers from panics raised by everything it wraps.
///
/// On a panic it logs an ERROR record `"recovered from panic"` with the panic
/// payload as `value` (plus a `stack` backtrace when enabled), answers
/// `500 Internal Server Error` and stops the chain.
///
/// Add it last so it wraps every other middleware; [`Builder::build`]
/// rejects chains where it is not.
///
/// [`Builder::build`]: crate::Builder::build
pub struct PanicRecovery {
    add_stack: bool,
    dispatch: Option<Dispatch>,
}

impl PanicRecovery {
    /// `add_stack` adds a `stack` field holding a backtrace captured where the
    /// panic was caught.
    pub fn new(add_stack: bool) -> Self {
        Self { add_stack, dispatch: None }
    }

    /// Sends the recovery record to `dispatch` instead of the ambient subscriber.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    fn report(&self, payload: &(dyn Any + Send)) {
        let value = panic_value(payload);
        log::scoped(self.dispatch.as_ref(), || {
            if self.add_stack {
                let stack = Backtrace::force_capture();
                error!(value = %value, stack = %stack, "recovered from panic");
            } else {
                error!(value = %value, "recovered from panic");
            }
        });
    }
}

impl Middleware for PanicRecovery {
    fn serve<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let caught = AssertUnwindSafe(next.run(ctx)).catch_unwind().await;
            if let Err(payload) = caught {
                self.report(payload.as_ref());
                ctx.code(StatusCode::INTERNAL_SERVER_ERROR);
                ctx.stop();
            }
        })
    }

    fn name(&self) -> &str {
        "PanicRecovery"
    }

    fn role(&self) -> Role {
        Role::Recovery
    }
}

/// Panic payloads are almost always `&str` or `String`.
fn panic_value(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Box<dyn Any>"
    }
}
