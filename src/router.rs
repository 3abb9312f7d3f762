//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. A [`Router`] is itself a
//! terminal [`Handler`]: wrap it to put a middleware chain in front of every
//! route.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::context::Context;
use crate::handler::{BoxFuture, BoxedHandler, Handler};

/// The application router.
///
/// Build it once at startup and pass it to [`wrap`](crate::wrap). Each
/// registration returns `self` so calls chain naturally. Unmatched requests
/// get `404 Not Found`.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust
    /// # use strand::{handler, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .get("/users/{id}", handler::endpoint(get_user))
    ///     .post("/users",     handler::endpoint(create_user));
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the path is not a valid route or conflicts with one already
    /// registered for the same method.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Arc::new(handler))
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(&BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl Handler for Router {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let req = ctx.request();
            match self.lookup(req.method(), req.path()) {
                Some((handler, params)) => {
                    ctx.request_mut().set_params(params);
                    handler.call(ctx).await;
                }
                None => ctx.code(StatusCode::NOT_FOUND),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::handler;
    use crate::request::Request;

    fn context(method: Method, uri: &str) -> Context {
        let req: Request = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
            .into();
        Context::new(req)
    }

    fn router() -> Router {
        Router::new().get(
            "/users/{id}",
            handler::from_fn(|ctx| {
                Box::pin(async move {
                    let id = ctx.request().param("id").unwrap_or("none").to_owned();
                    ctx.string(&id);
                })
            }),
        )
    }

    #[tokio::test]
    async fn params_reach_the_handler() {
        let mut ctx = context(Method::GET, "/users/42");
        router().call(&mut ctx).await;
        assert_eq!(ctx.response().body(), b"42");
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let mut ctx = context(Method::GET, "/nope");
        router().call(&mut ctx).await;
        assert_eq!(ctx.response().status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn other_method_is_404() {
        let mut ctx = context(Method::DELETE, "/users/42");
        router().call(&mut ctx).await;
        assert_eq!(ctx.response().status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_panic() {
        let _ = router().get("/users/{name}", handler::from_fn(|_ctx| Box::pin(async {})));
    }
}
