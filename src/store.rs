//! Session persistence.
//!
//! The persisting endpoint writes exactly one `sessions` row per request:
//!
//! | Column   | Type                        |
//! |----------|-----------------------------|
//! | `id`     | integer, primary key, assigned by the store |
//! | `result` | integer, nullable           |
//! | `status` | text, not null (`COMPLETED`) |
//!
//! # Unit of work
//!
//! Every [`SessionStore::create`] call runs in its own transaction:
//!
//! ```text
//! pool.begin()                 ← acquire a connection, BEGIN
//!   INSERT … RETURNING …       ← insert and reload in one statement
//! tx.commit()                  ← COMMIT, connection back to the pool
//! ```
//!
//! If anything fails before `commit`, the `Transaction` is dropped and sqlx
//! issues a rollback, so a failed call never leaves a committed row behind.
//! There is no shared state between calls beyond the pool itself.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Backend, DatabaseConfig};
use crate::error::Error;

// ── Records ───────────────────────────────────────────────────────────────────

/// Lifecycle tag stored in the `status` column.
///
/// Sessions are written once, already finished, so there is a single state.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(Self::Completed),
            other => Err(PersistError::Failed(format!("unknown session status `{other}`"))),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted summation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SessionRecord {
    pub id: i64,
    pub result: Option<i64>,
    pub status: SessionStatus,
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A storage operation failed. No record should be assumed to exist.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The store could not be reached: connection refused, I/O, TLS, pool
    /// exhausted or closed.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The store was reached but rejected or mangled the operation.
    #[error("persistence failed: {0}")]
    Failed(String),
}

impl PersistError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for PersistError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Unavailable(e.to_string()),
            other => Self::Failed(other.to_string()),
        }
    }
}

// ── SessionStore ──────────────────────────────────────────────────────────────

/// Storage seam for session records.
///
/// Handlers hold an `Arc<dyn SessionStore>`; [`SqlSessionStore`] is the
/// production implementation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a completed session holding `result` and returns it as stored.
    async fn create(&self, result: i64) -> Result<SessionRecord, PersistError>;

    /// Loads a session by id.
    async fn get(&self, id: i64) -> Result<Option<SessionRecord>, PersistError>;

    /// Succeeds if the store can currently serve queries.
    async fn ping(&self) -> Result<(), PersistError>;
}

// ── SqlSessionStore ───────────────────────────────────────────────────────────

/// [`SessionStore`] over an sqlx pool. Speaks PostgreSQL and SQLite.
pub struct SqlSessionStore {
    pool: AnyPool,
    backend: Backend,
}

impl SqlSessionStore {
    /// Builds the pool without opening a connection.
    ///
    /// Connections are made on first use, so the service can start while the
    /// database is still down; requests report [`PersistError::Unavailable`]
    /// until it comes up.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, Error> {
        let backend = config.backend()?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_lazy(&config.url)
            .map_err(PersistError::from)?;

        info!(?backend, max_connections = config.max_connections, "session store configured");
        Ok(Self { pool, backend })
    }

    /// Creates the `sessions` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), PersistError> {
        let ddl = match self.backend {
            Backend::Postgres => {
                r#"
                CREATE TABLE IF NOT EXISTS sessions (
                    id     BIGSERIAL PRIMARY KEY,
                    result BIGINT,
                    status VARCHAR NOT NULL
                )
                "#
            }
            // AUTOINCREMENT keeps SQLite from reusing the id of a deleted row.
            Backend::Sqlite => {
                r#"
                CREATE TABLE IF NOT EXISTS sessions (
                    id     INTEGER PRIMARY KEY AUTOINCREMENT,
                    result INTEGER,
                    status TEXT NOT NULL
                )
                "#
            }
        };

        sqlx::query(ddl).execute(&self.pool).await?;
        debug!("sessions table ready");
        Ok(())
    }

    /// Closes the pool. Later calls fail with [`PersistError::Unavailable`].
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn create(&self, result: i64) -> Result<SessionRecord, PersistError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO sessions (result, status) VALUES ($1, $2) RETURNING id, result, status",
        )
        .bind(result)
        .bind(SessionStatus::Completed.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let record = record_from_row(&row)?;

        tx.commit().await?;

        debug!(session_id = record.id, result, "session stored");
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<Option<SessionRecord>, PersistError> {
        let row = sqlx::query("SELECT id, result, status FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn ping(&self) -> Result<(), PersistError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn record_from_row(row: &AnyRow) -> Result<SessionRecord, PersistError> {
    let status: String = row.try_get("status")?;
    Ok(SessionRecord {
        id: row.try_get("id")?,
        result: row.try_get("result")?,
        status: status.parse()?,
    })
}
