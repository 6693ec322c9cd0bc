use crate::validation::ValidationError;
use config::ConfigError;
use connection_cache::{CacheError, DriverError};
use thiserror::Error;

/// Errors surfaced by entity stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Refusing to delete without a predicate")]
    EmptyPredicate,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid identifier: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store is not bound to a database")]
    NotBound,
}

impl From<CacheError> for StoreError {
    fn from(error: CacheError) -> Self {
        match error {
            CacheError::Configuration(e) => Self::Configuration(e),
            CacheError::Driver(e) => Self::Driver(e),
            CacheError::ReconnectFailed { source, .. } => Self::Driver(source),
        }
    }
}
