//! Minimal strand example — JSON endpoints behind logging, auth and recovery.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -H 'authorization: Bearer x' -X POST http://localhost:3000/admin/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl http://localhost:3000/panic

use http::StatusCode;
use serde::Deserialize;
use strand::middleware::{self, Field, Logger, LoggerOptions, PanicRecovery, PathInterceptor};
use strand::{Context, Request, Response, Router, Server, handler, wrap};

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let router = Router::new()
        .get("/users/{id}", handler::endpoint(get_user))
        .post("/admin/users", handler::from_fn(|ctx| Box::pin(create_user(ctx))))
        .get("/panic", handler::from_fn(|_ctx| Box::pin(async { panic!("oops") })));

    // Only /admin/** needs a token.
    let auth = middleware::from_fn(|ctx, next| {
        Box::pin(async move {
            if ctx.request().header("authorization").is_none() {
                ctx.code(StatusCode::UNAUTHORIZED);
                ctx.stop();
                return;
            }
            next.run(ctx).await;
        })
    })
    .named("auth");

    let logger = Logger::new(
        LoggerOptions::default()
            .fields([Field::Method, Field::Url, Field::Header])
            .header_keys(["User-Agent"]),
    );

    let app = wrap(router)
        .with(PathInterceptor::new("/admin", auth))
        .with(logger)
        .with(PanicRecovery::new(true))
        .build()
        .expect("invalid middleware chain");

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// POST /admin/users
async fn create_user(ctx: &mut Context) {
    let Ok(user) = ctx.must_decode_body::<NewUser>() else {
        return;
    };
    let _ = strand::log::log_if_err(ctx.json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "name": user.name }),
    ));
}
