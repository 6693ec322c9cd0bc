//! `StoreObject` implementation for [`EntityStore`]
//!
//! Each operation leases the tag's handle, compiles its predicate, lets the
//! handle run the statement and routes the raw result through the finalizer
//! before converting rows into entities.

use super::core::EntityStore;
use crate::errors::StoreError;
use crate::payload::Payload;
use crate::query_builder::{FetchOptions, Filter, UnionQuery};
use crate::traits::{Entity, StoreObject};
use async_trait::async_trait;
use config::ConfigResolver;
use connection_cache::statement::quote_identifier;
use connection_cache::{Record, UpdateMode};
use serde_json::Value;

fn to_entities<T: Entity>(rows: Vec<Record>) -> Result<Vec<T>, StoreError> {
    rows.iter().map(T::from_record).collect()
}

fn declared_fields<T: Entity>() -> Vec<String> {
    T::fields().iter().map(|f| f.to_string()).collect()
}

/// Columns, values and (for entities) the primary key value of an update
struct UpdateSet {
    fields: Vec<String>,
    values: Record,
    key: Option<Value>,
}

impl UpdateSet {
    fn from_payload<T: Entity>(payload: Payload<T>) -> Result<Self, StoreError> {
        match payload {
            Payload::Fields(fields) if fields.is_empty() => {
                let mut entity = T::default();
                entity.create(None)?;
                Self::from_entity(&entity)
            }
            Payload::Entity(entity) => Self::from_entity(&entity),
            Payload::Fields(values) => Ok(Self {
                fields: values.keys().cloned().collect(),
                values,
                key: None,
            }),
        }
    }

    fn from_entity<T: Entity>(entity: &T) -> Result<Self, StoreError> {
        Ok(Self {
            fields: declared_fields::<T>(),
            values: entity.to_record()?,
            key: Some(entity.primary_key_value()?),
        })
    }
}

#[async_trait]
impl<T: Entity> StoreObject for EntityStore<T> {
    type Model = T;

    async fn fetch_by_id<I>(&self, id: I) -> Result<Option<T>, StoreError>
    where
        I: Into<Value> + Send,
    {
        let where_clause = format!("{}=?", quote_identifier(T::primary_key()));
        let params = [id.into()];
        let mut handle = self.lease().await?;
        let raw = handle.fetch_entity(&where_clause, &params, "*", None).await;
        let row = self.finalizer.finalize(&handle, raw)?;
        row.as_ref().map(T::from_record).transpose()
    }

    async fn fetch_entity<F>(&self, filter: F, options: FetchOptions) -> Result<Option<T>, StoreError>
    where
        F: Into<Filter> + Send,
    {
        let where_clause = self.compiler.compile(&filter.into());
        let mut handle = self.lease().await?;
        let raw = handle
            .fetch_entity(
                &where_clause,
                &options.params,
                &options.fields,
                options.order_by.as_deref(),
            )
            .await;
        let row = self.finalizer.finalize(&handle, raw)?;
        row.as_ref().map(T::from_record).transpose()
    }

    async fn fetch_all<F>(&self, filter: F, options: FetchOptions) -> Result<Vec<T>, StoreError>
    where
        F: Into<Filter> + Send,
    {
        let where_clause = self.compiler.compile(&filter.into());
        let mut handle = self.lease().await?;
        let raw = handle
            .fetch_all(
                &where_clause,
                &options.params,
                &options.fields,
                options.order_by.as_deref(),
                options.limit,
            )
            .await;
        to_entities(self.finalizer.finalize(&handle, raw)?)
    }

    async fn fetch_array<F>(&self, filter: F, options: FetchOptions) -> Result<Vec<Record>, StoreError>
    where
        F: Into<Filter> + Send,
    {
        let where_clause = self.compiler.compile(&filter.into());
        let mut handle = self.lease().await?;
        let raw = handle
            .fetch_array(
                &where_clause,
                &options.params,
                &options.fields,
                options.order_by.as_deref(),
                options.start,
                options.limit,
            )
            .await;
        Ok(self.finalizer.finalize(&handle, raw)?)
    }

    async fn fetch_one<F>(&self, filter: F, fields: &str) -> Result<Option<Record>, StoreError>
    where
        F: Into<Filter> + Send,
    {
        let where_clause = self.compiler.compile(&filter.into());
        let mut handle = self.lease().await?;
        let raw = handle.fetch_entity(&where_clause, &[], fields, None).await;
        Ok(self.finalizer.finalize(&handle, raw)?)
    }

    async fn fetch_count<F>(&self, filter: F) -> Result<i64, StoreError>
    where
        F: Into<Filter> + Send,
    {
        let where_clause = self.compiler.compile(&filter.into());
        let mut handle = self.lease().await?;
        let raw = handle.fetch_count(&where_clause).await;
        Ok(self.finalizer.finalize(&handle, raw)?)
    }

    async fn fetch_where(&self, where_clause: &str) -> Result<Vec<T>, StoreError> {
        let mut handle = self.lease().await?;
        let raw = handle.fetch_all(where_clause, &[], "*", None, None).await;
        to_entities(self.finalizer.finalize(&handle, raw)?)
    }

    async fn fetch_by_sql(&self, sql: &str) -> Result<Vec<Record>, StoreError> {
        let mut handle = self.lease().await?;
        let raw = handle.fetch_by_sql(sql).await;
        Ok(self.finalizer.finalize(&handle, raw)?)
    }

    async fn fetch_by_union(&self, query: &UnionQuery) -> Result<Vec<Record>, StoreError> {
        let tag = self.tag().ok_or(StoreError::NotBound)?;
        let database = self.cache().resolver().database_name(tag)?;
        let sql = query.to_sql(&database)?;

        let mut handle = self.lease().await?;
        let raw = handle.fetch_by_sql(&sql).await;
        Ok(self.finalizer.finalize(&handle, raw)?)
    }

    async fn update<F>(
        &self,
        payload: Payload<T>,
        filter: F,
        mode: UpdateMode,
    ) -> Result<u64, StoreError>
    where
        F: Into<Filter> + Send,
    {
        let filter = filter.into();
        let set = UpdateSet::from_payload(payload)?;

        let (where_clause, where_params) = if !filter.is_empty() {
            (self.compiler.compile(&filter), Vec::new())
        } else if let Some(key) = set.key {
            (format!("{}=?", quote_identifier(T::primary_key())), vec![key])
        } else {
            return Err(StoreError::InvalidArgument(format!(
                "updating {} with raw fields needs a filter",
                T::entity_name()
            )));
        };

        let mut handle = self.lease().await?;
        let raw = handle
            .update(&set.fields, &set.values, &where_clause, &where_params, mode)
            .await;
        Ok(self.finalizer.finalize(&handle, raw)?)
    }

    async fn add(&self, payload: Payload<T>) -> Result<u64, StoreError> {
        let entity = match payload {
            Payload::Entity(entity) => entity,
            Payload::Fields(attrs) => {
                let mut entity = T::default();
                entity.create(Some(&attrs).filter(|a| !a.is_empty()))?;
                entity
            }
        };
        let values = entity.to_record()?;

        let mut handle = self.lease().await?;
        let raw = handle.add(&declared_fields::<T>(), &values).await;
        let outcome = self.finalizer.finalize(&handle, raw)?;
        Ok(outcome.last_insert_id.unwrap_or(0))
    }

    async fn remove<F>(&self, filter: F) -> Result<u64, StoreError>
    where
        F: Into<Filter> + Send,
    {
        let filter = filter.into();
        if filter.is_empty() {
            return Err(StoreError::EmptyPredicate);
        }
        let where_clause = self.compiler.compile(&filter);

        let mut handle = self.lease().await?;
        let raw = handle.remove(&where_clause).await;
        Ok(self.finalizer.finalize(&handle, raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::{Conditions, PredicateCompiler};
    use config::{AppConfig, ConfigError, DatabaseConfig};
    use connection_cache::memory::MemoryDriver;
    use connection_cache::{ConnectionCache, DriverError};
    use entity_derive::Entity;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use statement_log::{StatementLog, SQL_CHANNEL};
    use std::sync::Arc;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity)]
    #[entity(table = "users")]
    struct User {
        #[primary_key]
        id: u64,
        name: String,
        status: i64,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity)]
    #[entity(table = "orders")]
    struct Order {
        #[primary_key]
        order_no: String,
        total: i64,
    }

    struct Fixture {
        cache: Arc<ConnectionCache>,
        log: Arc<StatementLog>,
        driver: MemoryDriver,
    }

    impl Fixture {
        fn new() -> Self {
            let driver = MemoryDriver::new();
            let config = AppConfig::default().with_database(
                "common",
                DatabaseConfig::new(
                    "localhost".to_string(),
                    3306,
                    "shop".to_string(),
                    "root".to_string(),
                    String::new(),
                ),
            );
            Self {
                cache: Arc::new(ConnectionCache::new(
                    Arc::new(driver.clone()),
                    Arc::new(config),
                )),
                log: Arc::new(StatementLog::new()),
                driver,
            }
        }

        fn store<T: Entity>(&self) -> EntityStore<T> {
            EntityStore::new(Arc::clone(&self.cache), Arc::clone(&self.log), Some("common"))
        }

        fn last_sql(&self) -> String {
            self.driver.last_statement().map(|s| s.sql).unwrap_or_default()
        }
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_lazy_store_opens_on_first_operation() {
        let fx = Fixture::new();
        let users = fx.store::<User>();
        assert!(users.is_bound());
        assert_eq!(fx.driver.open_count(), 0);

        users.fetch_count(None::<&str>).await.unwrap();
        assert_eq!(fx.driver.open_count(), 1);
        assert!(fx.cache.contains("common").await);
    }

    #[tokio::test]
    async fn test_open_connects_eagerly() {
        let fx = Fixture::new();
        let store = EntityStore::<User>::open(Arc::clone(&fx.cache), Arc::clone(&fx.log), "common")
            .await
            .unwrap();
        assert_eq!(store.tag(), Some("common"));
        assert_eq!(fx.driver.open_count(), 1);

        let missing =
            EntityStore::<User>::open(Arc::clone(&fx.cache), Arc::clone(&fx.log), "nowhere").await;
        assert!(matches!(
            missing,
            Err(StoreError::Configuration(ConfigError::UnknownTag(_)))
        ));
    }

    #[tokio::test]
    async fn test_empty_filter_matches_fetch_where_one() {
        let fx = Fixture::new();
        let users = fx.store::<User>();

        users.fetch_all(Conditions::new(), FetchOptions::default()).await.unwrap();
        let compiled = fx.last_sql();
        users.fetch_where("1").await.unwrap();
        assert_eq!(compiled, fx.last_sql());
        assert_eq!(compiled, "SELECT * FROM `shop`.`users` WHERE 1");
    }

    #[tokio::test]
    async fn test_fetch_statements() {
        let fx = Fixture::new();
        let users = fx.store::<User>();

        let filter = Filter::column("status", "=1").union("OR vip = 1");
        users
            .fetch_all(filter, FetchOptions::new().order_by("id desc").limit(5))
            .await
            .unwrap();
        assert_eq!(
            fx.last_sql(),
            "SELECT * FROM `shop`.`users` WHERE 1 OR vip = 1 AND status =1 ORDER BY id desc LIMIT 5"
        );

        users
            .fetch_array("status=1", FetchOptions::new().fields("id,name").start(20).limit(10))
            .await
            .unwrap();
        assert_eq!(
            fx.last_sql(),
            "SELECT id,name FROM `shop`.`users` WHERE status=1 LIMIT 20,10"
        );

        users
            .fetch_entity("name=?", FetchOptions::new().param("ann"))
            .await
            .unwrap();
        let executed = fx.driver.last_statement().unwrap();
        assert_eq!(executed.sql, "SELECT * FROM `shop`.`users` WHERE name=? LIMIT 1");
        assert_eq!(executed.params, vec![json!("ann")]);

        users.fetch_one("id=3", "name").await.unwrap();
        assert_eq!(
            fx.last_sql(),
            "SELECT name FROM `shop`.`users` WHERE id=3 LIMIT 1"
        );
    }

    #[tokio::test]
    async fn test_add_then_fetch_by_id_round_trip() {
        let fx = Fixture::new();
        let users = fx.store::<User>();

        let id = users
            .add(Payload::Fields(record(json!({"name": "ann", "status": 2}))))
            .await
            .unwrap();
        assert_eq!(id, 1);

        let user = users.fetch_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.name, "ann");
        assert_eq!(user.status, 2);
        assert!(users.fetch_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_entity_inserts_declared_fields() {
        let fx = Fixture::new();
        let orders = fx.store::<Order>();

        let order = Order {
            order_no: "A-1".to_string(),
            total: 300,
        };
        orders.add(order.into()).await.unwrap();

        let executed = fx.driver.last_statement().unwrap();
        assert_eq!(
            executed.sql,
            "INSERT INTO `shop`.`orders` (`order_no`,`total`) VALUES (?,?)"
        );
        assert_eq!(executed.params, vec![json!("A-1"), json!(300)]);
    }

    #[tokio::test]
    async fn test_update_entity_targets_primary_key() {
        let fx = Fixture::new();
        let users = fx.store::<User>();
        let user = User {
            id: 7,
            name: "bob".to_string(),
            status: 1,
        };

        users
            .update(user.clone().into(), None::<&str>, UpdateMode::Absolute)
            .await
            .unwrap();
        let executed = fx.driver.last_statement().unwrap();
        assert_eq!(
            executed.sql,
            "UPDATE `shop`.`users` SET `id`=?,`name`=?,`status`=? WHERE `id`=?"
        );
        assert_eq!(executed.params, vec![json!(7), json!("bob"), json!(1), json!(7)]);

        users
            .update(user.into(), Filter::column("status", "=1"), UpdateMode::Absolute)
            .await
            .unwrap();
        let executed = fx.driver.last_statement().unwrap();
        assert!(executed.sql.ends_with("WHERE 1 AND status =1"));
        assert_eq!(executed.params.len(), 3);
    }

    #[tokio::test]
    async fn test_update_raw_fields() {
        let fx = Fixture::new();
        let users = fx.store::<User>();

        users
            .update(
                Payload::Fields(record(json!({"status": 1}))),
                "id=4",
                UpdateMode::Delta,
            )
            .await
            .unwrap();
        assert_eq!(
            fx.last_sql(),
            "UPDATE `shop`.`users` SET `status`=`status`+? WHERE id=4"
        );

        let without_filter = users
            .update(
                Payload::Fields(record(json!({"status": 1}))),
                None::<&str>,
                UpdateMode::Absolute,
            )
            .await;
        assert!(matches!(without_filter, Err(StoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_update_empty_payload_uses_default_entity() {
        let fx = Fixture::new();
        let users = fx.store::<User>();

        users
            .update(Payload::empty(), None::<&str>, UpdateMode::Absolute)
            .await
            .unwrap();
        let executed = fx.driver.last_statement().unwrap();
        assert!(executed.sql.ends_with("WHERE `id`=?"));
        assert_eq!(executed.params.last(), Some(&json!(0)));
    }

    #[tokio::test]
    async fn test_remove_requires_a_predicate() {
        let fx = Fixture::new();
        let users = fx.store::<User>();

        assert!(matches!(
            users.remove(Conditions::new()).await,
            Err(StoreError::EmptyPredicate)
        ));
        assert!(matches!(
            users.remove(None::<&str>).await,
            Err(StoreError::EmptyPredicate)
        ));
        assert!(fx.driver.statements().is_empty());

        users.remove("id=5").await.unwrap();
        assert_eq!(fx.last_sql(), "DELETE FROM `shop`.`users` WHERE id=5");
    }

    #[tokio::test]
    async fn test_fetch_by_union_uses_store_database() {
        let fx = Fixture::new();
        let users = fx.store::<User>();
        let query = UnionQuery::new().table("t1", ["a", "b"]).condition("t1.a=1");

        users.fetch_by_union(&query).await.unwrap();
        assert_eq!(fx.last_sql(), "select t1.a,t1.b from shop.t1 where 1 and t1.a=1");
    }

    #[tokio::test]
    async fn test_invalid_union_fails_before_connecting() {
        let fx = Fixture::new();
        let users = fx.store::<User>();

        let result = users.fetch_by_union(&UnionQuery::new().condition("1")).await;
        assert!(matches!(result, Err(StoreError::InvalidArgument(_))));
        assert_eq!(fx.driver.open_count(), 0);

        let unbound = EntityStore::<User>::unbound(Arc::clone(&fx.cache), Arc::clone(&fx.log));
        let query = UnionQuery::new().table("t1", ["a"]);
        assert!(matches!(
            unbound.fetch_by_union(&query).await,
            Err(StoreError::NotBound)
        ));
    }

    #[tokio::test]
    async fn test_shared_tag_shares_one_handle() {
        let fx = Fixture::new();
        let users = fx.store::<User>();
        let orders = fx.store::<Order>();

        users.fetch_count(None::<&str>).await.unwrap();
        orders.fetch_count(None::<&str>).await.unwrap();
        assert_eq!(fx.driver.open_count(), 1);
        assert_eq!(
            fx.last_sql(),
            "SELECT count(*) as count FROM `shop`.`orders` WHERE 1"
        );

        orders.close_db(Some("common")).await.unwrap();
        assert!(!fx.cache.contains("common").await);
        users.close_db(None).await.unwrap();

        // Next use reopens
        users.fetch_count(None::<&str>).await.unwrap();
        assert_eq!(fx.driver.open_count(), 2);
    }

    #[tokio::test]
    async fn test_change_table() {
        let fx = Fixture::new();
        let mut users = fx.store::<User>();

        users.change_table("users_2024").await.unwrap();
        assert_eq!(users.table(), "users_2024");
        users.fetch_where("1").await.unwrap();
        assert_eq!(fx.last_sql(), "SELECT * FROM `shop`.`users_2024` WHERE 1");

        assert!(matches!(
            users.change_table("users; drop").await,
            Err(StoreError::Validation(_))
        ));
        assert_eq!(users.table(), "users_2024");
    }

    #[tokio::test]
    async fn test_unbound_store() {
        let fx = Fixture::new();
        let users = EntityStore::<User>::unbound(Arc::clone(&fx.cache), Arc::clone(&fx.log));

        assert!(!users.is_bound());
        assert!(matches!(users.fetch_where("1").await, Err(StoreError::NotBound)));
        users.close_db(None).await.unwrap();
        assert_eq!(users.check_ping().await.unwrap().checked, 0);
        assert_eq!(fx.driver.open_count(), 0);
    }

    #[tokio::test]
    async fn test_statements_are_logged_and_failures_surface() {
        let fx = Fixture::new();
        let users = fx.store::<User>();

        users.fetch_where("status=1").await.unwrap();
        assert_eq!(
            fx.log.last_message(SQL_CHANNEL).as_deref(),
            Some("SELECT * FROM `shop`.`users` WHERE status=1")
        );

        fx.driver.fail_next("table is locked");
        let result = users.fetch_by_sql("SELECT 2").await;
        assert!(matches!(
            result,
            Err(StoreError::Driver(DriverError::Backend(msg))) if msg == "table is locked"
        ));
        assert_eq!(fx.log.last_message(SQL_CHANNEL).as_deref(), Some("SELECT 2"));
    }

    #[derive(Debug)]
    struct AlwaysFalse;

    impl PredicateCompiler for AlwaysFalse {
        fn compile(&self, _filter: &Filter) -> String {
            "0".to_string()
        }
    }

    #[tokio::test]
    async fn test_compiler_is_replaceable() {
        let fx = Fixture::new();
        let users = fx.store::<User>().with_compiler(Arc::new(AlwaysFalse));

        users.fetch_count("id=1").await.unwrap();
        assert_eq!(
            fx.last_sql(),
            "SELECT count(*) as count FROM `shop`.`users` WHERE 0"
        );
    }
}
