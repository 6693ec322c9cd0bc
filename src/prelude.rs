//! Convenience re-exports for common daobase usage
//!
//! # Example
//!
//! ```rust
//! use daobase::prelude::*;
//! ```

// Core components
pub use crate::core::DaoBase;
pub use crate::errors::DaoBaseError;

// Re-export centralized config
pub use config::{AppConfig, ConfigError, ConfigResolver, DatabaseConfig, HealthConfig};

// Re-export commonly used store-object types for convenience
pub use store_object::prelude::*;

// Re-export store_object module for macro-generated code
pub use store_object;

// Connection layer
pub use connection_cache::{
    CacheError, ConnectionCache, Driver, DriverError, HealthSummary, MySqlDriver,
};

// Statement log
pub use statement_log::prelude::*;

// Re-export entity derive for model creation
pub use entity_derive::{model, Entity};

// Common external dependencies
pub use async_trait;
pub use serde_json;
pub use tokio;
