//! Kubernetes health-check handlers.
//!
//! | Probe | Path | Answers |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Always `200 ok` while the process can serve HTTP. |
//! | **Readiness** | `/readyz` | `200 ready` if the session store answers a ping, else `503`. |
//!
//! `/sum` works without a database, but `/sum_async` does not, so the pod is
//! only marked ready while the store is reachable.

use tracing::warn;

use crate::api::AppState;
use crate::{Request, Response, Status};

/// Liveness probe. No dependencies.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// Readiness probe, gated on [`SessionStore::ping`](crate::store::SessionStore::ping).
pub async fn readiness(state: AppState, _req: Request) -> Response {
    match state.store.ping().await {
        Ok(()) => Response::text("ready"),
        Err(e) => {
            warn!("readiness check failed: {e}");
            Response::builder()
                .status(Status::ServiceUnavailable)
                .text("store unavailable")
        }
    }
}
