//! Core daobase functionality
//!
//! `DaoBase` owns the process-wide pieces every store shares: the resolved
//! configuration, the tag-keyed connection cache and the statement log.
//! Stores are handed out per entity and tag.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::errors::DaoBaseError;
use config::AppConfig;
use connection_cache::{ConnectionCache, Driver, HealthSummary, MySqlDriver};
use statement_log::StatementLog;
use store_object::{Entity, EntityStore};

/// Main coordinator that owns the connection cache and hands out stores
pub struct DaoBase {
    config: Arc<AppConfig>,
    cache: Arc<ConnectionCache>,
    log: Arc<StatementLog>,
}

impl std::fmt::Debug for DaoBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaoBase")
            .field("databases", &self.config.databases.len())
            .field("cache", &self.cache)
            .field("log", &self.log)
            .finish()
    }
}

impl DaoBase {
    /// Create a coordinator over `driver`; no connection is opened yet
    pub fn new(config: AppConfig, driver: Arc<dyn Driver>) -> Result<Self, DaoBaseError> {
        config.validate()?;
        let config = Arc::new(config);
        let cache = Arc::new(ConnectionCache::new(driver, config.clone()));

        Ok(Self {
            config,
            cache,
            log: Arc::new(StatementLog::new()),
        })
    }

    /// Coordinator over MySQL connections
    pub fn mysql(config: AppConfig) -> Result<Self, DaoBaseError> {
        Self::new(config, Arc::new(MySqlDriver::new()))
    }

    /// MySQL coordinator configured by [`AppConfig::load`]
    pub fn from_env() -> Result<Self, DaoBaseError> {
        Self::mysql(AppConfig::load()?)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ConnectionCache> {
        &self.cache
    }

    /// Log every store of this coordinator records its statements on
    pub fn log(&self) -> &Arc<StatementLog> {
        &self.log
    }

    /// Lazy store for `T` on `tag`
    pub fn store<T: Entity>(&self, tag: &str) -> EntityStore<T> {
        EntityStore::new(self.cache.clone(), self.log.clone(), Some(tag))
    }

    /// Store for `T` whose connection is opened and pinged up front
    pub async fn open_store<T: Entity>(&self, tag: &str) -> Result<EntityStore<T>, DaoBaseError> {
        Ok(EntityStore::open(self.cache.clone(), self.log.clone(), tag).await?)
    }

    /// Store for entity-only objects that never reach a database
    pub fn unbound_store<T: Entity>(&self) -> EntityStore<T> {
        EntityStore::unbound(self.cache.clone(), self.log.clone())
    }

    /// Ping every cached connection once, reconnecting dropped ones
    pub async fn health_check(&self) -> Result<HealthSummary, DaoBaseError> {
        Ok(self.cache.check_all().await?)
    }

    /// Run [`health_check`](Self::health_check) every
    /// `health.ping_interval_seconds` until the returned task is aborted.
    /// Failures are logged and the loop keeps going.
    pub fn spawn_health_check(&self) -> JoinHandle<()> {
        let cache = self.cache.clone();
        let period = Duration::from_secs(self.config.health.ping_interval_seconds);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match cache.check_all().await {
                    Ok(summary) if !summary.reconnected.is_empty() => {
                        tracing::info!(
                            checked = summary.checked,
                            reconnected = ?summary.reconnected,
                            "health check reconnected dropped connections"
                        );
                    }
                    Ok(_summary) => {
                        crate::trace_log!("health check ok: {} connections", _summary.checked);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "health check failed");
                    }
                }
            }
        })
    }

    /// Close the connection for `tag`; nothing open is not an error
    pub async fn close(&self, tag: &str) -> Result<(), DaoBaseError> {
        Ok(self.cache.close(tag).await?)
    }

    pub async fn close_all(&self) -> Result<(), DaoBaseError> {
        Ok(self.cache.close_all().await?)
    }
}
