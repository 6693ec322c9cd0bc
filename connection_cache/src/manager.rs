//! Connection cache implementation
//!
//! This module provides the `ConnectionCache`, the process-wide mapping from
//! a connection tag to its single live connection handle.

use crate::driver::Driver;
use crate::errors::CacheError;
use crate::handle::ConnectionHandle;
use config::{ConfigError, ConfigResolver};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard};

/// Handle shared by every accessor using the same tag
pub type SharedHandle = Arc<Mutex<ConnectionHandle>>;

/// Handle locked for the duration of one operation
pub type HandleLease = OwnedMutexGuard<ConnectionHandle>;

/// Per-tag cell; filled once by whichever caller opens the connection first
type Slot = Arc<OnceCell<SharedHandle>>;

/// Result of a keep-alive sweep over all cached handles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthSummary {
    pub checked: usize,
    pub reconnected: Vec<String>,
}

/// Tag-keyed cache of live connections.
///
/// The map lock is only held for lookups and evictions. Opening a connection
/// is serialized per tag through the tag's slot, so concurrent first use of a
/// tag opens exactly one connection while other tags stay usable.
pub struct ConnectionCache {
    driver: Arc<dyn Driver>,
    resolver: Arc<dyn ConfigResolver>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl Debug for ConnectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = match self.slots.try_lock() {
            Ok(slots) => slots
                .values()
                .filter(|slot| slot.initialized())
                .count()
                .to_string(),
            Err(_) => "locked".to_string(),
        };

        f.debug_struct("ConnectionCache")
            .field("cached", &cached)
            .finish()
    }
}

impl ConnectionCache {
    /// Create an empty cache
    pub fn new(driver: Arc<dyn Driver>, resolver: Arc<dyn ConfigResolver>) -> Self {
        Self {
            driver,
            resolver,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolver(&self) -> &Arc<dyn ConfigResolver> {
        &self.resolver
    }

    /// Get or create the handle for `tag`, bound to `entity` and `table`
    pub async fn acquire(
        &self,
        tag: &str,
        entity: &str,
        table: &str,
    ) -> Result<SharedHandle, CacheError> {
        let lease = self.lease(tag, entity, table).await?;
        let handle = OwnedMutexGuard::mutex(&lease).clone();
        drop(lease);
        Ok(handle)
    }

    /// Like [`acquire`](Self::acquire), but keeps the handle locked for the
    /// caller so the binding cannot change until the lease is dropped.
    pub async fn lease(
        &self,
        tag: &str,
        entity: &str,
        table: &str,
    ) -> Result<HandleLease, CacheError> {
        loop {
            let slot = self.slot(tag).await?;
            let shared = match slot.get_or_try_init(|| self.open_handle(tag)).await {
                Ok(shared) => Arc::clone(shared),
                Err(e) => {
                    self.evict_slot(tag, &slot).await;
                    return Err(e);
                }
            };
            let mut handle = shared.lock_owned().await;

            // Closed in place, or evicted between lookup and lock
            if handle.is_closed() {
                self.evict_slot(tag, &slot).await;
                continue;
            }

            // Slot was evicted by `close` while the connection was being opened
            if !self.is_current(tag, &slot).await {
                if let Err(e) = handle.close().await {
                    tracing::warn!(tag = %tag, error = %e, "failed to close orphaned connection");
                }
                continue;
            }

            handle.bind_entity(entity);
            handle.bind_table(table);
            return Ok(handle);
        }
    }

    async fn slot(&self, tag: &str) -> Result<Slot, CacheError> {
        if tag.is_empty() {
            return Err(ConfigError::UnknownTag(String::new()).into());
        }

        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get(tag) {
            return Ok(Arc::clone(slot));
        }

        self.resolver.resolve(tag)?;
        let slot = Slot::default();
        slots.insert(tag.to_string(), Arc::clone(&slot));
        Ok(slot)
    }

    async fn open_handle(&self, tag: &str) -> Result<SharedHandle, CacheError> {
        let descriptor = self.resolver.resolve(tag)?;
        let connection = self.driver.open(&descriptor).await?;
        tracing::info!(tag = %tag, database = %descriptor.database, "opened connection");

        Ok(Arc::new(Mutex::new(ConnectionHandle::new(
            tag,
            descriptor.database,
            connection,
        ))))
    }

    async fn is_current(&self, tag: &str, slot: &Slot) -> bool {
        self.slots
            .lock()
            .await
            .get(tag)
            .is_some_and(|cached| Arc::ptr_eq(cached, slot))
    }

    /// Drop `slot` from the map unless it was already replaced
    async fn evict_slot(&self, tag: &str, slot: &Slot) {
        let mut slots = self.slots.lock().await;
        if slots.get(tag).is_some_and(|cached| Arc::ptr_eq(cached, slot)) {
            slots.remove(tag);
        }
    }

    /// Rebind the handle's active table without reopening the connection
    pub async fn change_table(&self, handle: &SharedHandle, table: &str) {
        handle.lock().await.bind_table(table);
    }

    /// Close and evict the handle for `tag`; a tag with nothing open is not an error
    pub async fn close(&self, tag: &str) -> Result<(), CacheError> {
        let evicted = self.slots.lock().await.remove(tag);

        if let Some(handle) = evicted.as_ref().and_then(|slot| slot.get()) {
            handle.lock().await.close().await?;
            tracing::info!(tag = %tag, "closed connection");
        }
        Ok(())
    }

    /// Close every cached handle
    pub async fn close_all(&self) -> Result<(), CacheError> {
        let evicted: Vec<(String, Slot)> = self.slots.lock().await.drain().collect();

        let mut first_error = None;
        for (tag, slot) in evicted {
            let Some(handle) = slot.get() else {
                continue;
            };
            if let Err(e) = handle.lock().await.close().await {
                tracing::warn!(tag = %tag, error = %e, "failed to close connection");
                first_error.get_or_insert(CacheError::Driver(e));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Ping every cached handle, reconnecting dropped ones.
    ///
    /// A failed ping is recovered locally; only a failed reconnect is
    /// reported, after every handle has been checked.
    pub async fn check_all(&self) -> Result<HealthSummary, CacheError> {
        let snapshot = self.open_handles().await;

        let mut summary = HealthSummary::default();
        let mut failure = None;

        for (tag, handle) in snapshot {
            let mut handle = handle.lock().await;
            if handle.is_closed() {
                continue;
            }

            summary.checked += 1;
            match handle.check_ping().await {
                Ok(true) => summary.reconnected.push(tag),
                Ok(false) => {}
                Err(source) => {
                    tracing::error!(tag = %tag, error = %source, "reconnect failed");
                    failure.get_or_insert(CacheError::ReconnectFailed { tag, source });
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    async fn open_handles(&self) -> Vec<(String, SharedHandle)> {
        self.slots
            .lock()
            .await
            .iter()
            .filter_map(|(tag, slot)| slot.get().map(|handle| (tag.clone(), Arc::clone(handle))))
            .collect()
    }

    pub async fn contains(&self, tag: &str) -> bool {
        self.slots
            .lock()
            .await
            .get(tag)
            .is_some_and(|slot| slot.initialized())
    }

    pub async fn len(&self) -> usize {
        self.open_handles().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Tags with a live handle, sorted
    pub async fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .open_handles()
            .await
            .into_iter()
            .map(|(tag, _)| tag)
            .collect();
        tags.sort();
        tags
    }
}
