//! # summa
//!
//! A small HTTP service that sums arrays of numeric strings.
//!
//! ```text
//! POST /sum        {"array": ["1", "bad", null, "3"]}  →  {"sum": 4}
//! POST /sum_async  {"array": ["10", "x", "20"]}        →  {"session_id": 17, "result": 30}
//! ```
//!
//! `/sum_async` additionally records every result as a `COMPLETED` row in a
//! `sessions` table (PostgreSQL, or SQLite for local use).
//!
//! ## Layout
//!
//! - [`sum`] — the coercion and summation rule both endpoints share
//! - [`store`] — the session store and its one-transaction-per-write contract
//! - [`api`] — request bodies, handlers, the route table
//! - [`config`] — TOML + environment configuration
//! - [`Router`], [`Server`] — radix-tree routing over hyper, graceful shutdown
//!
//! ## Running it
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use summa::api::{AppState, routes};
//! use summa::config::DatabaseConfig;
//! use summa::store::SqlSessionStore;
//! use summa::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), summa::Error> {
//!     let store = SqlSessionStore::connect_lazy(&DatabaseConfig::new("sqlite://summa.db?mode=rwc"))?;
//!     store.ensure_schema().await?;
//!
//!     let app = routes(AppState::new(Arc::new(store)));
//!     Server::bind("127.0.0.1:8000".parse().unwrap()).serve(app).await
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod api;
pub mod config;
pub mod health;
pub mod store;
pub mod sum;

pub use error::Error;
pub use handler::{Handler, StateHandler};
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::{DEFAULT_BODY_LIMIT, Server};
pub use status::Status;
