//! Driver seam
//!
//! The cache never talks to a database directly; it opens connections
//! through a [`Driver`] and executes statements through [`Connection`].

use crate::errors::DriverError;
use crate::params::{ExecOutcome, Record};
use async_trait::async_trait;
use config::DatabaseConfig;
use serde_json::Value;

/// Opens physical connections from a resolved descriptor
#[async_trait]
pub trait Driver: Send + Sync {
    async fn open(&self, config: &DatabaseConfig) -> Result<Box<dyn Connection>, DriverError>;
}

/// One physical connection. Statements use positional `?` placeholders.
#[async_trait]
pub trait Connection: Send {
    /// Cheap liveness probe; `false` means the connection must be reopened
    async fn ping(&mut self) -> bool;

    /// Drop the current physical link and open a fresh one
    async fn reconnect(&mut self) -> Result<(), DriverError>;

    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<Record>, DriverError>;

    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Record>, DriverError>;

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecOutcome, DriverError>;

    async fn close(&mut self) -> Result<(), DriverError>;
}
