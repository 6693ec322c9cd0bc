//! Error types for connection operations
//!
//! This module defines the errors raised by drivers and by the
//! connection cache itself.

use config::ConfigError;
use thiserror::Error;

/// Errors surfaced by a driver; never interpreted by the layers above
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("SQL driver error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Connection timed out after {0}s")]
    ConnectTimeout(u64),

    #[error("Connection for tag '{0}' is closed")]
    Closed(String),

    #[error("No table bound on connection for tag '{0}'")]
    NoTable(String),

    #[error("Column '{column}' of type {type_name} has no JSON mapping")]
    UnsupportedColumn { column: String, type_name: String },

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Connection cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Reconnect failed for tag '{tag}': {source}")]
    ReconnectFailed {
        tag: String,
        #[source]
        source: DriverError,
    },
}
