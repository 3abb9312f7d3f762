//! Path-prefix interception.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{BoxedMiddleware, Middleware, Next};
use crate::context::Context;
use crate::handler::BoxFuture;

/// Applies a middleware only to requests under a path prefix.
///
/// A request matches when its path equals the prefix or starts with the
/// prefix followed by `/`. `"/admin"` matches `/admin` and `/admin/users`,
/// not `/administrator`.
///
/// The inner middleware acts as a guard. It may wrap the rest of the chain
/// by running `next`, or only inspect the request and return; in that case
/// the chain continues after it unless it called [`Context::stop`]. Either
/// way the rest of the chain runs at most once. Non-matching requests
/// continue directly.
pub struct PathInterceptor {
    prefix: String,
    prefix_slash: String,
    inner: BoxedMiddleware,
}

impl PathInterceptor {
    pub fn new(prefix: &str, inner: impl Middleware) -> Self {
        let prefix = clean(prefix);
        let prefix_slash = if prefix.ends_with('/') {
            prefix.clone()
        } else {
            format!("{prefix}/")
        };
        Self { prefix, prefix_slash, inner: Arc::new(inner) }
    }

    fn matches(&self, path: &str) -> bool {
        path == self.prefix || path.starts_with(&self.prefix_slash)
    }
}

impl Middleware for PathInterceptor {
    fn serve<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, ()> {
        if !self.matches(ctx.request().path()) {
            return next.run(ctx);
        }
        Box::pin(async move {
            let resume = next.fork();
            let entered = AtomicBool::new(false);
            self.inner.serve(ctx, next.watched(&entered)).await;
            if !entered.load(Ordering::Relaxed) {
                resume.run(ctx).await;
            }
        })
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Lexically cleans a path prefix: collapses repeated slashes, resolves `.`
/// and `..`, drops the trailing slash. Always absolute.
fn clean(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}
