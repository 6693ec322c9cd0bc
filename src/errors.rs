//! Error types for the daobase crate
//!
//! This module contains the error returned by `DaoBase` itself; store
//! operations return `StoreError` directly.

use config::ConfigError;
use connection_cache::CacheError;
use store_object::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaoBaseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
