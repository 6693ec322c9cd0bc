use crate::errors::StoreError;
use crate::finalizer::ResultFinalizer;
use crate::query_builder::{PredicateCompiler, TextualCompiler};
use crate::traits::Entity;
use crate::validation::ValidatedTableName;
use connection_cache::{ConnectionCache, HandleLease, HealthSummary};
use statement_log::StatementLog;
use std::marker::PhantomData;
use std::sync::Arc;

/// Entity store bound (or not) to a connection tag.
///
/// Stores sharing a tag share one cached handle; every operation leases it,
/// rebinds it to this store's entity and table, and runs under the lease.
pub struct EntityStore<T: Entity> {
    pub(crate) cache: Arc<ConnectionCache>,
    pub(crate) tag: Option<String>,
    pub(crate) table: String,
    pub(crate) compiler: Arc<dyn PredicateCompiler>,
    pub(crate) finalizer: ResultFinalizer,
    pub(crate) _phantom: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            tag: self.tag.clone(),
            table: self.table.clone(),
            compiler: Arc::clone(&self.compiler),
            finalizer: self.finalizer.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T: Entity> std::fmt::Debug for EntityStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("entity", &T::entity_name())
            .field("tag", &self.tag)
            .field("table", &self.table)
            .field("compiler", &self.compiler)
            .finish()
    }
}

impl<T: Entity> EntityStore<T> {
    /// Lazy store: nothing is opened until the first operation.
    /// An empty tag leaves the store unbound.
    pub fn new(cache: Arc<ConnectionCache>, log: Arc<StatementLog>, tag: Option<&str>) -> Self {
        Self {
            cache,
            tag: tag.filter(|t| !t.is_empty()).map(str::to_string),
            table: T::table_name().to_string(),
            compiler: Arc::new(TextualCompiler),
            finalizer: ResultFinalizer::new(log),
            _phantom: PhantomData,
        }
    }

    /// Store for entity-only objects that are never persisted
    pub fn unbound(cache: Arc<ConnectionCache>, log: Arc<StatementLog>) -> Self {
        Self::new(cache, log, None)
    }

    /// Eager store: opens (or reuses) the tag's connection and pings it
    pub async fn open(
        cache: Arc<ConnectionCache>,
        log: Arc<StatementLog>,
        tag: &str,
    ) -> Result<Self, StoreError> {
        let store = Self::new(cache, log, Some(tag));
        let mut handle = store.lease().await?;
        handle.check_ping().await?;
        drop(handle);
        Ok(store)
    }

    /// Replace the predicate compiler
    pub fn with_compiler(mut self, compiler: Arc<dyn PredicateCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.tag.is_some()
    }

    /// Table this store currently targets
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn cache(&self) -> &Arc<ConnectionCache> {
        &self.cache
    }

    pub fn log(&self) -> &Arc<StatementLog> {
        self.finalizer.log()
    }

    /// Point this store at another table with the same shape, e.g. a shard
    pub async fn change_table(&mut self, name: &str) -> Result<(), StoreError> {
        let name = ValidatedTableName::new(name)?;
        if let Some(tag) = self.tag.as_deref() {
            let handle = self.cache.acquire(tag, T::entity_name(), &self.table).await?;
            self.cache.change_table(&handle, name.as_str()).await;
        }
        tracing::debug!(entity = T::entity_name(), table = %name, "table changed");
        self.table = name.into_string();
        Ok(())
    }

    /// Close the connection for `tag`, or for this store's own tag.
    /// Nothing open is not an error; the next operation reopens lazily.
    pub async fn close_db(&self, tag: Option<&str>) -> Result<(), StoreError> {
        match tag.or(self.tag.as_deref()) {
            Some(tag) => Ok(self.cache.close(tag).await?),
            None => Ok(()),
        }
    }

    /// Ping every cached connection, reconnecting dropped ones
    pub async fn check_ping(&self) -> Result<HealthSummary, StoreError> {
        Ok(self.cache.check_all().await?)
    }

    pub(crate) async fn lease(&self) -> Result<HandleLease, StoreError> {
        let tag = self.tag.as_deref().ok_or(StoreError::NotBound)?;
        Ok(self.cache.lease(tag, T::entity_name(), &self.table).await?)
    }
}
