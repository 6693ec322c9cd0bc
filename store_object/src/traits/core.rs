//! Store contract
//!
//! The generic CRUD surface every entity store provides. Filters accept
//! anything convertible into a [`Filter`]: raw predicate text, a
//! [`Conditions`](crate::query_builder::Conditions) list, column pairs or
//! `None`.

use crate::errors::StoreError;
use crate::payload::Payload;
use crate::query_builder::{FetchOptions, Filter, UnionQuery};
use crate::traits::Entity;
use async_trait::async_trait;
use connection_cache::{Record, UpdateMode};
use serde_json::Value;
use std::fmt::Debug;

/// Trait that defines common database operations for one entity type
#[async_trait]
pub trait StoreObject: Send + Sync + Debug {
    /// The entity this store reads and writes
    type Model: Entity;

    /// Row whose primary key equals `id`
    async fn fetch_by_id<I>(&self, id: I) -> Result<Option<Self::Model>, StoreError>
    where
        I: Into<Value> + Send;

    /// First row matching `filter`
    async fn fetch_entity<F>(
        &self,
        filter: F,
        options: FetchOptions,
    ) -> Result<Option<Self::Model>, StoreError>
    where
        F: Into<Filter> + Send;

    /// Every row matching `filter`, honoring `options.limit`
    async fn fetch_all<F>(
        &self,
        filter: F,
        options: FetchOptions,
    ) -> Result<Vec<Self::Model>, StoreError>
    where
        F: Into<Filter> + Send;

    /// Raw rows, paginated with `options.start` / `options.limit`
    async fn fetch_array<F>(
        &self,
        filter: F,
        options: FetchOptions,
    ) -> Result<Vec<Record>, StoreError>
    where
        F: Into<Filter> + Send;

    /// First raw row matching `filter`
    async fn fetch_one<F>(&self, filter: F, fields: &str) -> Result<Option<Record>, StoreError>
    where
        F: Into<Filter> + Send;

    async fn fetch_count<F>(&self, filter: F) -> Result<i64, StoreError>
    where
        F: Into<Filter> + Send;

    /// Rows matching an already built predicate, bypassing the compiler
    async fn fetch_where(&self, where_clause: &str) -> Result<Vec<Self::Model>, StoreError>;

    /// Run a complete statement and return its raw rows
    async fn fetch_by_sql(&self, sql: &str) -> Result<Vec<Record>, StoreError>;

    /// Multi-table select against this store's database
    async fn fetch_by_union(&self, query: &UnionQuery) -> Result<Vec<Record>, StoreError>;

    /// Update rows and return how many changed.
    ///
    /// With an empty `filter` the entity's own primary key selects the row;
    /// raw fields have no key, so they require a filter.
    async fn update<F>(
        &self,
        payload: Payload<Self::Model>,
        filter: F,
        mode: UpdateMode,
    ) -> Result<u64, StoreError>
    where
        F: Into<Filter> + Send;

    /// Insert one entity and return the generated id (0 when there is none)
    async fn add(&self, payload: Payload<Self::Model>) -> Result<u64, StoreError>;

    /// Delete matching rows. An empty filter is always rejected.
    async fn remove<F>(&self, filter: F) -> Result<u64, StoreError>
    where
        F: Into<Filter> + Send;
}
