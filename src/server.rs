//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. stops calling `listener.accept()`, so no new connections are made,
//! 2. tells every open connection to finish its in-flight request and close
//!    (idle keep-alive connections close at once),
//! 3. returns from [`Server::serve`], which lets `main` close the store and exit.
//!
//! A persisting request that is mid-transaction when the signal arrives still
//! commits (or rolls back) normally; nothing is cut off.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::status::Status;

/// Request bodies larger than this are refused with `413` unless
/// [`Server::body_limit`] says otherwise.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

enum Bind {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// The HTTP server.
///
/// ```rust,no_run
/// # use summa::{Router, Server};
/// # async fn run(app: Router) -> Result<(), summa::Error> {
/// Server::bind("0.0.0.0:8000".parse().unwrap())
///     .body_limit(64 * 1024)
///     .serve(app)
///     .await
/// # }
/// ```
pub struct Server {
    bind: Bind,
    body_limit: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when it starts serving.
    pub fn bind(addr: SocketAddr) -> Self {
        Self { bind: Bind::Addr(addr), body_limit: DEFAULT_BODY_LIMIT }
    }

    /// Serves on an already-bound listener.
    ///
    /// Binding to port 0 and passing the listener here is how tests get an
    /// ephemeral port.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { bind: Bind::Listener(listener), body_limit: DEFAULT_BODY_LIMIT }
    }

    /// Largest request body, in bytes, that is read before answering `413`.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Serves `router` until SIGTERM or Ctrl-C.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_until(router, shutdown_signal()).await
    }

    /// Serves `router` until `shutdown` resolves, then drains in-flight
    /// connections.
    pub async fn serve_until(
        self,
        router: Router,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = match self.bind {
            Bind::Addr(addr) => TcpListener::bind(addr).await?,
            Bind::Listener(listener) => listener,
        };
        let router = Arc::new(router);
        let body_limit = self.body_limit;

        info!(addr = %listener.local_addr()?, body_limit, "summa listening");

        let builder = ConnBuilder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Checked first so a signal stops accepting even with a backlog.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    // Called once per request on the connection.
                    let svc = service_fn(move |req| {
                        let router = Arc::clone(&router);
                        async move { dispatch(router, req, remote_addr, body_limit).await }
                    });

                    let conn = graceful.watch(builder.serve_connection(io, svc).into_owned());
                    tasks.spawn(async move {
                        if let Err(e) = conn.await {
                            debug!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        drop(listener);
        graceful.shutdown().await;
        while tasks.join_next().await.is_some() {}

        info!("summa stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Buffers the body, routes the request and converts the response for hyper.
///
/// Every failure becomes a status code, so hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
    body_limit: usize,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let span = info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        peer = %remote_addr
    );

    let response = async move {
        let Ok(method) = Method::try_from(req.method()) else {
            return Response::status(Status::MethodNotAllowed);
        };

        let (parts, body) = req.into_parts();
        let body = match read_body(body, body_limit).await {
            Ok(body) => body,
            Err(status) => return Response::status(status),
        };

        let request = Request::new(method, parts.uri.path(), body);
        let response = router.handle(request).await;
        debug!(status = response.status_code().code(), "request complete");
        response
    }
    .instrument(span)
    .await;

    Ok(response.into_inner())
}

/// Collects at most `limit` bytes of `body`.
///
/// `413` if the body is longer, `400` if the stream breaks.
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, Status>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(limit, "request body too large");
            Err(Status::ContentTooLarge)
        }
        Err(e) => {
            warn!("failed to read request body: {e}");
            Err(Status::BadRequest)
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). Ctrl-C only on Windows.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn body_within_limit_is_read_whole() {
        let body = Full::new(Bytes::from_static(br#"{"array":["1"]}"#));
        assert_eq!(read_body(body, 64).await.unwrap(), &br#"{"array":["1"]}"#[..]);
    }

    #[tokio::test]
    async fn body_over_limit_is_413() {
        let body = Full::new(Bytes::from(vec![b'1'; 65]));
        assert_eq!(read_body(body, 64).await.unwrap_err(), Status::ContentTooLarge);
    }
}
