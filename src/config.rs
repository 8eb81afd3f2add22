//! Service configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. built-in defaults (listen address, body limit, pool sizing, log level),
//! 2. an optional TOML file,
//! 3. command-line flags and their environment variables.
//!
//! The database URL has **no** default. A service that silently talks to a
//! hardcoded host is worse than one that refuses to start, so a missing URL
//! is a [`ConfigError::MissingDatabaseUrl`].
//!
//! ```toml
//! log_level = "info"
//!
//! [server]
//! listen = "0.0.0.0:8000"
//! max_body_bytes = 1048576
//!
//! [database]
//! url = "postgres://summa:secret@db:5432/summa"
//! max_connections = 10
//! acquire_timeout_secs = 5
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::server::DEFAULT_BODY_LIMIT;

const DEFAULT_LISTEN: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8000);
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("database url is required (set `database.url`, --database-url or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("unsupported database url `{0}`: expected postgres:// or sqlite:")]
    UnsupportedDatabase(String),
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Request bodies above this many bytes are answered with `413`.
    pub max_body_bytes: usize,
}

/// Everything the session store needs to build its connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Which SQL dialect a [`DatabaseConfig`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub log_level: Option<String>,
}

// ── File layer ────────────────────────────────────────────────────────────────

// Every field is optional here so a file may leave the URL to the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    server: FileServer,
    database: FileDatabase,
    log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileServer {
    listen: Option<SocketAddr>,
    max_body_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout_secs: Option<u64>,
}

// ── Resolution ────────────────────────────────────────────────────────────────

impl Config {
    /// Reads `path` (if given), applies `overrides` and validates the result.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_owned(),
                    source,
                })?;
                toml::from_str(&text)?
            }
            None => FileConfig::default(),
        };
        Self::resolve(file, overrides)
    }

    /// Like [`Config::load`], from TOML text instead of a file.
    pub fn from_toml(text: &str, overrides: Overrides) -> Result<Self, ConfigError> {
        Self::resolve(toml::from_str(text)?, overrides)
    }

    fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let listen = overrides.listen.or(file.server.listen).unwrap_or(DEFAULT_LISTEN);

        let url = overrides
            .database_url
            .or(file.database.url)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let database = DatabaseConfig {
            url,
            max_connections: file.database.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout_secs: file
                .database
                .acquire_timeout_secs
                .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        };
        database.backend()?;

        Ok(Self {
            server: ServerConfig {
                listen,
                max_body_bytes: file.server.max_body_bytes.unwrap_or(DEFAULT_BODY_LIMIT),
            },
            database,
            log_level: overrides
                .log_level
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()),
        })
    }
}

impl DatabaseConfig {
    /// A config for `url` with default pool sizing.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Detects the SQL dialect from the URL scheme.
    pub fn backend(&self) -> Result<Backend, ConfigError> {
        let url = self.url.as_str();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Backend::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Backend::Sqlite)
        } else {
            // Only the scheme is echoed back; the rest may carry credentials.
            let scheme = url.split(':').next().unwrap_or_default();
            Err(ConfigError::UnsupportedDatabase(format!("{scheme}:")))
        }
    }
}
