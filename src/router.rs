//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. A path that exists under
//! some other method answers `405`, a path that exists nowhere answers `404`.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler, StateHandler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each [`Router::on`] / [`Router::on_with`] call returns `self` so
/// registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

/// Why a lookup found no handler.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Miss {
    NotFound,
    MethodNotAllowed,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// ```rust,no_run
    /// # use summa::{Method, Request, Response, Router};
    /// # async fn sum(_: Request) -> Response { Response::text("") }
    /// # async fn liveness(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Post, "/sum",     sum)
    ///     .on(Method::Get,  "/healthz", liveness);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or clashes with an existing one.
    /// Routes are fixed at startup, so this is a programming error.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.insert(method, path, handler.into_boxed_handler())
    }

    /// Like [`Router::on`], for a handler that takes `state` as its first
    /// argument. Each request gets its own clone of `state`.
    ///
    /// # Panics
    ///
    /// Same as [`Router::on`].
    pub fn on_with<S>(
        self,
        method: Method,
        path: &str,
        state: S,
        handler: impl StateHandler<S>,
    ) -> Self {
        self.insert(method, path, handler.with_state(state))
    }

    fn insert(mut self, method: Method, path: &str, handler: BoxedHandler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(&self, method: Method, path: &str) -> Result<BoxedHandler, Miss> {
        match self.routes.get(&method).and_then(|tree| tree.at(path).ok()) {
            Some(matched) => Ok(Arc::clone(matched.value)),
            None if self.routes.values().any(|tree| tree.at(path).is_ok()) => {
                Err(Miss::MethodNotAllowed)
            }
            None => Err(Miss::NotFound),
        }
    }

    /// Routes one buffered request to its handler and awaits the response.
    pub(crate) async fn handle(&self, req: Request) -> Response {
        match self.lookup(req.method(), req.path()) {
            Ok(handler) => handler.call(req).await,
            Err(Miss::NotFound) => Response::status(Status::NotFound),
            Err(Miss::MethodNotAllowed) => Response::status(Status::MethodNotAllowed),
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
