//! # strand
//!
//! Ordered middleware chains around a terminal HTTP handler.
//!
//! Every request gets a fresh [`Context`] carrying the request, the response
//! being written and a `stopped` flag. The context is threaded by `&mut`
//! through each [`Middleware`](middleware::Middleware) and finally the
//! terminal [`Handler`]. Any middleware can wrap the rest of the chain, cut
//! it short with [`Context::stop`], or recover from a panic inside it.
//!
//! ## Order
//!
//! Middlewares run in the REVERSE of the order they are added. The last one
//! added is the outermost wrapper:
//!
//! ```text
//! wrap(h).with(m0).with(m1).with(recovery)
//!
//! recovery → m1 → m0 → h → m0 → m1 → recovery
//! ```
//!
//! That is why [`PanicRecovery`](middleware::PanicRecovery) goes last, and
//! [`Builder::build`] refuses a chain where it does not.
//!
//! ## Terminal handler
//!
//! [`wrap`] always takes the terminal handler explicitly; there is no
//! default. Pass a [`Router`] to dispatch by method and path (unmatched
//! requests get `404`), or any [`Handler`] such as one made with
//! [`handler::from_fn`] or [`handler::endpoint`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use strand::middleware::{self, Logger, PanicRecovery};
//! use strand::{handler, wrap, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::new()
//!         .get("/users/{id}", handler::endpoint(get_user));
//!
//!     let auth = middleware::from_fn(|ctx, next| Box::pin(async move {
//!         if ctx.request().header("authorization").is_none() {
//!             ctx.code(StatusCode::UNAUTHORIZED);
//!             ctx.stop();
//!             return;
//!         }
//!         next.run(ctx).await;
//!     }))
//!     .named("auth");
//!
//!     let app = wrap(router)
//!         .with(auth)
//!         .with(Logger::default())
//!         .with(PanicRecovery::new(false))
//!         .build()
//!         .unwrap();
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//! ```

mod chain;
mod context;
mod error;
mod request;
mod response;
mod router;
mod server;
mod wrap;

pub mod decode;
pub mod handler;
pub mod log;
pub mod middleware;

pub use context::{Context, attached};
pub use error::Error;
pub use handler::Handler;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use wrap::{Builder, Wrapped, wrap};
