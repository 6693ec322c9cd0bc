//! Connection cache for tag-keyed database connections
//!
//! This crate owns the driver seam, the connection handle that assembles
//! statements against its bound table, and the cache that keeps exactly one
//! live handle per connection tag.

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod driver;
pub mod errors;
pub mod handle;
pub mod manager;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod mysql;
pub mod params;
pub mod prelude;
pub mod statement;

// Re-export centralized config
pub use config::{ConfigResolver, DatabaseConfig};

pub use driver::{Connection, Driver};
pub use errors::{CacheError, DriverError};
pub use handle::ConnectionHandle;
pub use manager::{ConnectionCache, HandleLease, HealthSummary, SharedHandle};
pub use mysql::MySqlDriver;
pub use params::{ExecOutcome, Record, UpdateMode};
