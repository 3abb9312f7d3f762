//! Serving a [`Wrapped`] chain over TCP.
//!
//! Each connection runs on its own task and may carry HTTP/1.1 or HTTP/2
//! (whatever the client negotiates). Each request on it gets its body
//! collected, a fresh [`Context`](crate::Context), and one pass through the
//! chain.
//!
//! # Shutdown
//!
//! [`Server::serve`] stops on SIGTERM or Ctrl-C; [`Server::serve_with_shutdown`]
//! on any future. Either way the listener stops accepting at once, and the
//! call returns after every open connection has finished.
//!
//! # Panics in handlers
//!
//! A panic that escapes a chain without
//! [`PanicRecovery`](crate::middleware::PanicRecovery) ends its connection
//! task: tokio contains it and the client sees the connection close.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::wrap::Wrapped;

/// Where the server gets its connections from.
enum Bind {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// The HTTP server.
pub struct Server {
    bind: Bind,
}

impl Server {
    /// Binds to `addr` when [`serve`](Server::serve) is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// ```rust,no_run
    /// use strand::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { bind: Bind::Addr(addr) }
    }

    /// Serves connections from an already bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { bind: Bind::Listener(listener) }
    }

    /// Serves `app` until SIGTERM or Ctrl-C, then drains open connections.
    pub async fn serve(self, app: Wrapped) -> Result<(), Error> {
        self.serve_with_shutdown(app, shutdown_signal()).await
    }

    /// Serves `app` until `signal` resolves, then drains open connections.
    pub async fn serve_with_shutdown(
        self,
        app: Wrapped,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = match self.bind {
            Bind::Addr(addr) => TcpListener::bind(addr).await?,
            Bind::Listener(listener) => listener,
        };
        let local = listener.local_addr()?;
        info!(addr = %local, "strand listening");

        let mut conns = JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                biased;

                () = &mut signal => {
                    info!(open = conns.len(), "shutting down, draining connections");
                    break;
                }

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        conns.spawn(connection(app.clone(), stream, peer));
                    }
                    Err(e) => error!("accept error: {e}"),
                },

                Some(_) = conns.join_next(), if !conns.is_empty() => {}
            }
        }

        while conns.join_next().await.is_some() {}

        info!(addr = %local, "strand stopped");
        Ok(())
    }
}

/// Serves every request of one connection.
async fn connection(app: Wrapped, stream: TcpStream, peer: SocketAddr) {
    debug!(%peer, "connection opened");
    let svc = service_fn(move |req| dispatch(app.clone(), req));
    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), svc)
        .await
    {
        error!(%peer, "connection error: {e}");
    }
}

/// Collects the body and runs one request through the chain. Unreadable
/// bodies answer `400`; everything else is whatever the chain wrote.
async fn dispatch(
    app: Wrapped,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(method = %parts.method, uri = %parts.uri, "reading request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let req = Request::from(http::Request::from_parts(parts, body));
    Ok(app.call(req).await.into_inner())
}

/// Resolves on SIGTERM or SIGINT (only Ctrl-C off Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("listening for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("listening for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}
