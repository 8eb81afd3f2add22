//! Unified error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::store::PersistError;

/// The error type returned by summa's fallible startup and serving operations.
///
/// Request-level failures (422, 503, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: bad configuration, an unreachable store at
/// startup, binding to a port or accepting a connection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("store: {0}")]
    Persist(#[from] PersistError),
}
