//! Route handlers and their type erasure.
//!
//! Two shapes of handler can be registered:
//!
//! | Shape | Registered with | Example |
//! |---|---|---|
//! | `async fn(Request) -> impl IntoResponse` | [`Router::on`](crate::Router::on) | `api::sum`, `health::liveness` |
//! | `async fn(S, Request) -> impl IntoResponse` | [`Router::on_with`](crate::Router::on_with) | `api::sum_async`, `health::readiness` |
//!
//! Both end up as an [`Endpoint`]: the function plus the state it is called
//! with. A stateless handler is simply an endpoint over `()`. At request time
//! the endpoint clones its state (for [`AppState`](crate::api::AppState) that
//! is one `Arc` bump) and hands the owned copy to the handler, so the returned
//! future is `'static` and can run on any worker thread.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Object-safe form of a registered route.
///
/// `#[doc(hidden)] pub` because it appears in the return types of the public
/// handler traits.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// What the router stores per route.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// A handler that needs nothing but the request.
///
/// Covered by a blanket impl for every matching `async fn` or closure; sealed
/// so it cannot be implemented by hand.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// A handler that is called with a clone of `S` before the request.
pub trait StateHandler<S>: private::SealedWith<S> + Send + Sync + 'static {
    #[doc(hidden)]
    fn with_state(self, state: S) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
    pub trait SealedWith<S> {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(Endpoint { f: move |_: (), req: Request| self(req), state: () })
    }
}

impl<F, S, Fut, R> private::SealedWith<S> for F
where
    F: Fn(S, Request) -> Fut + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, S, Fut, R> StateHandler<S> for F
where
    F: Fn(S, Request) -> Fut + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn with_state(self, state: S) -> BoxedHandler {
        Arc::new(Endpoint { f: self, state })
    }
}

/// A handler function bound to the state it is called with.
struct Endpoint<F, S> {
    f: F,
    state: S,
}

impl<F, S, Fut, R> ErasedHandler for Endpoint<F, S>
where
    F: Fn(S, Request) -> Fut,
    S: Clone,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.f)(self.state.clone(), req);
        Box::pin(async move { fut.await.into_response() })
    }
}
