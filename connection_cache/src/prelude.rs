//! Convenience re-exports for common connection-cache usage

// Core connection components
pub use crate::driver::{Connection, Driver};
pub use crate::errors::{CacheError, DriverError};
pub use crate::handle::ConnectionHandle;
pub use crate::manager::{ConnectionCache, HandleLease, HealthSummary, SharedHandle};
pub use crate::mysql::MySqlDriver;
pub use crate::params::{ExecOutcome, Record, UpdateMode};

// Re-export centralized config
pub use config::{ConfigResolver, DatabaseConfig};

// Common external dependencies
pub use async_trait::async_trait;
pub use serde_json;
pub use tokio;
