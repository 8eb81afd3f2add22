//! HTTP API: request/response bodies, handlers and the route table.
//!
//! | Route | Body in | Body out |
//! |---|---|---|
//! | `POST /sum` | `{"array": [string \| null, …]}` | `{"sum": int}` |
//! | `POST /sum_async` | same | `{"session_id": int, "result": int}` |
//! | `GET /healthz` | — | `ok` |
//! | `GET /readyz` | — | `ready` / 503 |
//!
//! Array elements that do not parse as integers are silently ignored; see
//! [`crate::sum`]. Error responses carry `{"detail": "…"}`:
//!
//! | Status | When |
//! |---|---|
//! | 422 | body is not JSON, lacks `array`, has non-string elements, or the sum overflows |
//! | 503 | the session store is unreachable |
//! | 500 | the session store rejected the write |

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::health;
use crate::method::Method;
use crate::request::Request;
use crate::response::{IntoResponse, Json, Response};
use crate::router::Router;
use crate::status::Status;
use crate::store::{PersistError, SessionStore};
use crate::sum::{SumError, coerce_sum};

/// Shared by every handler that touches the store. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

// ── Bodies ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SumRequest {
    pub array: Vec<Option<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SumResponse {
    pub sum: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PersistedSum {
    pub session_id: i64,
    pub result: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub detail: String,
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error(transparent)]
    Sum(#[from] SumError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            Self::InvalidBody(_) | Self::Sum(_) => Status::UnprocessableContent,
            Self::Persist(e) if e.is_unavailable() => Status::ServiceUnavailable,
            Self::Persist(_) => Status::InternalServerError,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Persist(e) if e.is_unavailable() => warn!("{e}"),
            Self::Persist(e) => error!("{e}"),
            _ => {}
        }

        let body = ErrorBody { detail: self.to_string() };
        match serde_json::to_vec(&body) {
            Ok(bytes) => Response::builder().status(status).json(bytes),
            Err(_) => Response::status(status),
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `POST /sum` — adds up the integer-looking elements of `array`.
pub async fn sum(req: Request) -> Result<Json<SumResponse>, ApiError> {
    let body: SumRequest = req.json()?;
    let sum = coerce_sum(body.array)?;
    Ok(Json(SumResponse { sum }))
}

/// `POST /sum_async` — like [`sum`], then stores the result as a completed
/// session and returns its id.
pub async fn sum_async(state: AppState, req: Request) -> Result<Json<PersistedSum>, ApiError> {
    let body: SumRequest = req.json()?;
    let result = coerce_sum(body.array)?;
    let record = state.store.create(result).await?;

    info!(session_id = record.id, result, "sum persisted");
    Ok(Json(PersistedSum { session_id: record.id, result }))
}

/// The full route table.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .on(Method::Post,      "/sum",       sum)
        .on_with(Method::Post, "/sum_async", state.clone(), sum_async)
        .on(Method::Get,       "/healthz",   health::liveness)
        .on_with(Method::Get,  "/readyz",    state, health::readiness)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use crate::store::{SessionRecord, SessionStatus};

    /// In-memory store that can be switched off to simulate an outage.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<SessionRecord>>,
        down: AtomicBool,
        reject: AtomicBool,
    }

    impl MemoryStore {
        fn check(&self) -> Result<(), PersistError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(PersistError::Unavailable("connection refused".into()));
            }
            if self.reject.load(Ordering::SeqCst) {
                return Err(PersistError::Failed("constraint violated".into()));
            }
            Ok(())
        }

        fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SessionStore for MemoryStore {
        async fn create(&self, result: i64) -> Result<SessionRecord, PersistError> {
            self.check()?;
            let mut rows = self.rows.lock().unwrap();
            let record = SessionRecord {
                id: rows.len() as i64 + 1,
                result: Some(result),
                status: SessionStatus::Completed,
            };
            rows.push(record.clone());
            Ok(record)
        }

        async fn get(&self, id: i64) -> Result<Option<SessionRecord>, PersistError> {
            self.check()?;
            Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
        }

        async fn ping(&self) -> Result<(), PersistError> {
            self.check()
        }
    }

    fn app() -> (Arc<MemoryStore>, Router) {
        let store = Arc::new(MemoryStore::default());
        let router = routes(AppState::new(store.clone()));
        (store, router)
    }

    async fn post(router: &Router, path: &str, body: &str) -> Response {
        router.handle(Request::new(Method::Post, path, body.to_owned())).await
    }

    fn decode<T: serde::de::DeserializeOwned>(res: &Response) -> T {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[tokio::test]
    async fn sum_ignores_nulls_and_junk() {
        let (store, router) = app();
        let res = post(&router, "/sum", r#"{"array": ["1", null, "bad", "3", "2.5"]}"#).await;
        assert_eq!(res.status_code(), Status::Ok);
        assert_eq!(decode::<SumResponse>(&res), SumResponse { sum: 4 });
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn sum_of_empty_array_is_zero() {
        let (_, router) = app();
        let res = post(&router, "/sum", r#"{"array": []}"#).await;
        assert_eq!(decode::<SumResponse>(&res).sum, 0);
    }

    #[tokio::test]
    async fn sum_works_while_store_is_down() {
        let (store, router) = app();
        store.down.store(true, Ordering::SeqCst);
        let res = post(&router, "/sum", r#"{"array": ["-5", "+5", "2"]}"#).await;
        assert_eq!(res.status_code(), Status::Ok);
        assert_eq!(decode::<SumResponse>(&res).sum, 2);
    }

    #[tokio::test]
    async fn sum_async_persists_one_completed_record() {
        let (store, router) = app();
        let res = post(&router, "/sum_async", r#"{"array": ["10", "x", "20"]}"#).await;
        assert_eq!(res.status_code(), Status::Ok);

        let body: PersistedSum = decode(&res);
        assert_eq!(body.result, 30);
        assert!(body.session_id > 0);

        let stored = store.get(body.session_id).await.unwrap().unwrap();
        assert_eq!(stored.result, Some(30));
        assert_eq!(stored.status, SessionStatus::Completed);

        let again: PersistedSum = decode(&post(&router, "/sum_async", r#"{"array": []}"#).await);
        assert_ne!(again.session_id, body.session_id);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn sum_async_reports_outage_as_503() {
        let (store, router) = app();
        store.down.store(true, Ordering::SeqCst);

        let res = post(&router, "/sum_async", r#"{"array": ["1"]}"#).await;
        assert_eq!(res.status_code(), Status::ServiceUnavailable);
        assert!(decode::<ErrorBody>(&res).detail.starts_with("storage unavailable"));

        store.down.store(false, Ordering::SeqCst);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn sum_async_reports_rejected_write_as_500() {
        let (store, router) = app();
        store.reject.store(true, Ordering::SeqCst);
        let res = post(&router, "/sum_async", r#"{"array": ["1"]}"#).await;
        assert_eq!(res.status_code(), Status::InternalServerError);
        assert!(decode::<ErrorBody>(&res).detail.starts_with("persistence failed"));
    }

    #[tokio::test]
    async fn malformed_bodies_are_422() {
        let (store, router) = app();
        for body in ["not json", r#"{}"#, r#"{"array": [1, 2]}"#, r#"{"array": "12"}"#] {
            for path in ["/sum", "/sum_async"] {
                let res = post(&router, path, body).await;
                assert_eq!(res.status_code(), Status::UnprocessableContent, "{path} {body}");
            }
        }
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn overflowing_sum_is_422_and_not_persisted() {
        let (store, router) = app();
        let body = format!(r#"{{"array": ["{}", "1"]}}"#, i64::MAX);
        let res = post(&router, "/sum_async", &body).await;
        assert_eq!(res.status_code(), Status::UnprocessableContent);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn readiness_follows_the_store() {
        let (store, router) = app();
        let get = |path: &'static str| router.handle(Request::new(Method::Get, path, ""));

        assert_eq!(get("/healthz").await.body(), b"ok");
        assert_eq!(get("/readyz").await.status_code(), Status::Ok);

        store.down.store(true, Ordering::SeqCst);
        assert_eq!(get("/readyz").await.status_code(), Status::ServiceUnavailable);
        assert_eq!(get("/healthz").await.status_code(), Status::Ok);
    }

    #[tokio::test]
    async fn unknown_routes_and_methods() {
        let (_, router) = app();
        assert_eq!(post(&router, "/nope", "").await.status_code(), Status::NotFound);
        let res = router.handle(Request::new(Method::Get, "/sum", "")).await;
        assert_eq!(res.status_code(), Status::MethodNotAllowed);
    }
}
