//! Result finalization
//!
//! Every store operation hands its raw result to [`ResultFinalizer`] before
//! returning. The finalizer records the statement the handle just sent and
//! returns the result untouched, failures included.

use connection_cache::ConnectionHandle;
use statement_log::{StatementLog, SQL_CHANNEL};
use std::sync::Arc;

/// Records the last executed statement on the `sql` channel
#[derive(Debug, Clone)]
pub struct ResultFinalizer {
    log: Arc<StatementLog>,
}

impl ResultFinalizer {
    pub fn new(log: Arc<StatementLog>) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &Arc<StatementLog> {
        &self.log
    }

    pub fn finalize<R, E>(&self, handle: &ConnectionHandle, result: Result<R, E>) -> Result<R, E> {
        if let Some(statement) = handle.last_statement() {
            self.log.record(statement, SQL_CHANNEL);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::DatabaseConfig;
    use connection_cache::memory::MemoryDriver;
    use connection_cache::{Driver, DriverError};

    async fn handle(driver: &MemoryDriver) -> ConnectionHandle {
        let descriptor = DatabaseConfig::new(
            "localhost".to_string(),
            3306,
            "shop".to_string(),
            "root".to_string(),
            String::new(),
        );
        let connection = driver.open(&descriptor).await.unwrap();
        let mut handle = ConnectionHandle::new("common", "shop", connection);
        handle.bind_table("users");
        handle
    }

    #[tokio::test]
    async fn test_success_passes_through_and_is_logged() {
        let driver = MemoryDriver::new();
        let mut handle = handle(&driver).await;
        let log = Arc::new(StatementLog::new());
        let finalizer = ResultFinalizer::new(Arc::clone(&log));

        let raw = handle.fetch_count("1").await;
        let count = finalizer.finalize(&handle, raw).unwrap();

        assert_eq!(count, 0);
        assert_eq!(
            log.last_message(SQL_CHANNEL).as_deref(),
            Some("SELECT count(*) as count FROM `shop`.`users` WHERE 1")
        );
    }

    #[tokio::test]
    async fn test_failure_is_not_swallowed() {
        let driver = MemoryDriver::new();
        let mut handle = handle(&driver).await;
        let log = Arc::new(StatementLog::new());
        let finalizer = ResultFinalizer::new(Arc::clone(&log));

        driver.fail_next("lost connection");
        let raw = handle.fetch_by_sql("SELECT 1").await;
        let result = finalizer.finalize(&handle, raw);

        assert!(matches!(result, Err(DriverError::Backend(msg)) if msg == "lost connection"));
        assert_eq!(log.last_message(SQL_CHANNEL).as_deref(), Some("SELECT 1"));
        assert_eq!(log.recorded_count(), 1);
    }

    #[tokio::test]
    async fn test_early_failure_does_not_replay_previous_statement() {
        let driver = MemoryDriver::new();
        let mut handle = handle(&driver).await;
        let log = Arc::new(StatementLog::new());
        let finalizer = ResultFinalizer::new(Arc::clone(&log));

        let raw = handle.fetch_count("1").await;
        finalizer.finalize(&handle, raw).unwrap();
        handle.close().await.unwrap();

        let raw = handle.remove("id=5").await;
        assert!(matches!(
            finalizer.finalize(&handle, raw),
            Err(DriverError::Closed(_))
        ));
        assert_eq!(log.recorded_count(), 1);
    }

    #[tokio::test]
    async fn test_nothing_recorded_before_first_statement() {
        let driver = MemoryDriver::new();
        let handle = handle(&driver).await;
        let log = Arc::new(StatementLog::new());
        let finalizer = ResultFinalizer::new(Arc::clone(&log));

        let value: Result<i32, DriverError> = Ok(3);
        assert_eq!(finalizer.finalize(&handle, value).unwrap(), 3);
        assert_eq!(log.recorded_count(), 0);
    }
}
