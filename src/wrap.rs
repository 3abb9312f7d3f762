//! Entry point: attaching a context and running the chain.

use std::sync::Arc;

use tracing::Dispatch;
use tracing::instrument::WithSubscriber;

use crate::chain::Chain;
use crate::context::{self, Context};
use crate::error::Error;
use crate::handler::Handler;
use crate::middleware::{BoxedMiddleware, Middleware, Role};
use crate::request::Request;
use crate::response::Response;

/// Starts a chain around `handler`. There is no default handler; pass a
/// [`Router`](crate::Router) to dispatch by path.
///
/// Middlewares are served in the REVERSE of the order they are added, so add
/// [`PanicRecovery`](crate::middleware::PanicRecovery) last to catch panics
/// from everything else.
///
/// ```rust
/// use strand::{handler, middleware::{Logger, PanicRecovery}, wrap};
///
/// let app = wrap(handler::from_fn(|ctx| Box::pin(async move { ctx.string("ok") })))
///     .with(Logger::default())
///     .with(PanicRecovery::new(false))
///     .build()
///     .expect("valid chain");
/// ```
pub fn wrap(handler: impl Handler) -> Builder {
    Builder {
        handler: Arc::new(handler),
        middlewares: Vec::new(),
        dispatch: None,
    }
}

/// Collects middlewares for [`wrap`].
pub struct Builder {
    handler: Arc<dyn Handler>,
    middlewares: Vec<BoxedMiddleware>,
    dispatch: Option<Dispatch>,
}

impl Builder {
    /// Appends a middleware. The last one added runs first.
    pub fn with(self, middleware: impl Middleware) -> Self {
        self.with_boxed(Arc::new(middleware))
    }

    /// Appends an already shared middleware.
    pub fn with_boxed(mut self, middleware: BoxedMiddleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Makes `dispatch` the default subscriber while a request runs through
    /// the chain, handler included.
    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Validates the chain.
    ///
    /// At most one [`Role::Recovery`] middleware is allowed, and it must be
    /// the last one added.
    pub fn build(self) -> Result<Wrapped, Error> {
        let recoveries: Vec<usize> = self
            .middlewares
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role() == Role::Recovery)
            .map(|(i, _)| i)
            .collect();

        let len = self.middlewares.len();
        match recoveries.as_slice() {
            [] => {}
            [position] if *position == len - 1 => {}
            [position] => {
                return Err(Error::RecoveryNotOutermost {
                    name: self.middlewares[*position].name().to_owned(),
                    position: *position,
                    len,
                });
            }
            many => return Err(Error::DuplicateRecovery { count: many.len() }),
        }

        Ok(Wrapped {
            chain: Arc::new(Chain::new(self.middlewares, self.handler)),
            dispatch: self.dispatch,
        })
    }
}

/// A handler with its middleware chain, ready to serve requests.
///
/// Cheap to clone; clones share the chain.
#[derive(Clone)]
pub struct Wrapped {
    chain: Arc<Chain>,
    dispatch: Option<Dispatch>,
}

impl Wrapped {
    /// Serves one request: attaches a fresh [`Context`], runs the chain and
    /// returns the response written to the context.
    ///
    /// # Panics
    ///
    /// Panics if `req` already carries a context, which means a wrapped
    /// handler was nested inside another chain.
    pub async fn call(&self, req: Request) -> Response {
        if context::attached(&req) {
            panic!(
                "context already attached to {} {}: wrapped handlers must not be nested",
                req.method(),
                req.path()
            );
        }
        let mut ctx = Context::new(req);
        match &self.dispatch {
            Some(dispatch) => {
                self.chain
                    .exec(&mut ctx)
                    .with_subscriber(dispatch.clone())
                    .await
            }
            None => self.chain.exec(&mut ctx).await,
        }
        ctx.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler;
    use crate::middleware::{self, PanicRecovery};

    fn ok() -> impl Handler {
        handler::from_fn(|ctx| Box::pin(async move { ctx.string("ok") }))
    }

    fn noop() -> impl Middleware {
        middleware::from_fn(|ctx, next| Box::pin(async move { next.run(ctx).await })).named("noop")
    }

    #[test]
    fn recovery_added_last_is_accepted() {
        assert!(wrap(ok()).with(noop()).with(PanicRecovery::new(false)).build().is_ok());
        assert!(wrap(ok()).with(PanicRecovery::new(true)).build().is_ok());
        assert!(wrap(ok()).build().is_ok());
    }

    #[test]
    fn recovery_not_last_is_rejected() {
        let err = wrap(ok())
            .with(PanicRecovery::new(false))
            .with(noop())
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::RecoveryNotOutermost { ref name, position: 0, len: 2 } if name == "PanicRecovery"
        ));
    }

    #[test]
    fn two_recoveries_are_rejected() {
        let err = wrap(ok())
            .with(PanicRecovery::new(false))
            .with(PanicRecovery::new(false))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::DuplicateRecovery { count: 2 }));
    }
}
