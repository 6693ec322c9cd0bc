//! # daobase
//!
//! A data-access layer for MySQL: one cached connection per database tag,
//! generic entity stores with a small predicate language, and a log of every
//! statement sent.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daobase::prelude::*;
//!
//! #[model]
//! #[entity(table = "users")]
//! pub struct User {
//!     #[primary_key]
//!     pub id: u64,
//!     pub name: String,
//!     pub status: i32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::default().with_database(
//!         "common",
//!         DatabaseConfig::new(
//!             "localhost".to_string(), 3306, "shop".to_string(),
//!             "root".to_string(), "secret".to_string(),
//!         ),
//!     );
//!
//!     let dao = DaoBase::mysql(config)?;
//!     let _health = dao.spawn_health_check();
//!
//!     let users = dao.store::<User>("common");
//!     let id = users.add(Payload::Fields(Record::new())).await?;
//!     let active = users
//!         .fetch_all(Filter::column("status", "=1"), FetchOptions::new().limit(10))
//!         .await?;
//!     println!("inserted {}, {} active users", id, active.len());
//!
//!     Ok(())
//! }
//! ```

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

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::DaoBase;
pub use errors::DaoBaseError;

// Re-export centralized config
pub use config::{AppConfig, ConfigResolver, DatabaseConfig, HealthConfig};

// Re-export internal crates used by macros and public API
// These MUST be public for the generated macro code to work correctly
pub use config;
pub use connection_cache;
pub use entity_derive;
pub use statement_log;
pub use store_object;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
