//! Connection handle
//!
//! A handle wraps one physical connection for a tag together with the
//! entity/table it is currently bound to. All statements built here target
//! the bound table and the last one is kept for diagnostics.

use crate::driver::Connection;
use crate::errors::DriverError;
use crate::params::{ExecOutcome, Record, UpdateMode};
use crate::statement::{self, Limit, Select};
use serde_json::Value;

/// Open connection bound to one tag
pub struct ConnectionHandle {
    tag: String,
    database: String,
    entity: Option<String>,
    table: Option<String>,
    connection: Box<dyn Connection>,
    last_statement: Option<String>,
    closed: bool,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("tag", &self.tag)
            .field("database", &self.database)
            .field("entity", &self.entity)
            .field("table", &self.table)
            .field("closed", &self.closed)
            .finish()
    }
}

impl ConnectionHandle {
    pub fn new(
        tag: impl Into<String>,
        database: impl Into<String>,
        connection: Box<dyn Connection>,
    ) -> Self {
        Self {
            tag: tag.into(),
            database: database.into(),
            entity: None,
            table: None,
            connection,
            last_statement: None,
            closed: false,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Text of the statement sent by the latest operation; `None` when that
    /// operation failed before reaching the connection
    pub fn last_statement(&self) -> Option<&str> {
        self.last_statement.as_deref()
    }

    pub fn bind_entity(&mut self, entity: &str) {
        self.entity = Some(entity.to_string());
    }

    /// Rebind the active table without reopening the connection
    pub fn bind_table(&mut self, table: &str) {
        self.table = Some(table.to_string());
    }

    /// `` `database`.`table` `` for the bound table
    pub fn lib_name(&self) -> Result<String, DriverError> {
        let table = self
            .table
            .as_deref()
            .ok_or_else(|| DriverError::NoTable(self.tag.clone()))?;
        Ok(statement::qualified_table(&self.database, table))
    }

    /// Single row matching `where_clause`
    pub async fn fetch_entity(
        &mut self,
        where_clause: &str,
        params: &[Value],
        fields: &str,
        order_by: Option<&str>,
    ) -> Result<Option<Record>, DriverError> {
        self.last_statement = None;
        let from = self.lib_name()?;
        let sql = Select::new(fields, &from, where_clause)
            .order_by(order_by)
            .limit(Some(Limit::Count(1)))
            .to_sql();
        self.ensure_open()?;
        self.remember(&sql);
        self.connection.fetch_optional(&sql, params).await
    }

    /// All rows matching `where_clause`
    pub async fn fetch_all(
        &mut self,
        where_clause: &str,
        params: &[Value],
        fields: &str,
        order_by: Option<&str>,
        limit: Option<u64>,
    ) -> Result<Vec<Record>, DriverError> {
        self.last_statement = None;
        let from = self.lib_name()?;
        let sql = Select::new(fields, &from, where_clause)
            .order_by(order_by)
            .limit(limit.map(Limit::Count))
            .to_sql();
        self.ensure_open()?;
        self.remember(&sql);
        self.connection.fetch_all(&sql, params).await
    }

    /// Paginated rows; `start` only applies together with `limit`
    pub async fn fetch_array(
        &mut self,
        where_clause: &str,
        params: &[Value],
        fields: &str,
        order_by: Option<&str>,
        start: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Vec<Record>, DriverError> {
        self.last_statement = None;
        let from = self.lib_name()?;
        let window = limit.map(|count| Limit::Range {
            start: start.unwrap_or(0),
            count,
        });
        let sql = Select::new(fields, &from, where_clause)
            .order_by(order_by)
            .limit(window)
            .to_sql();
        self.ensure_open()?;
        self.remember(&sql);
        self.connection.fetch_all(&sql, params).await
    }

    pub async fn fetch_count(&mut self, where_clause: &str) -> Result<i64, DriverError> {
        self.last_statement = None;
        let from = self.lib_name()?;
        let sql = statement::count_sql(&from, where_clause);
        self.ensure_open()?;
        self.remember(&sql);
        let row = self.connection.fetch_optional(&sql, &[]).await?;
        Ok(row.as_ref().map(count_of).unwrap_or(0))
    }

    /// Update `fields` with their values from `values`; missing values bind as NULL.
    /// `where_params` bind after the SET values.
    pub async fn update(
        &mut self,
        fields: &[String],
        values: &Record,
        where_clause: &str,
        where_params: &[Value],
        mode: UpdateMode,
    ) -> Result<u64, DriverError> {
        self.last_statement = None;
        let from = self.lib_name()?;
        let sql = statement::update_sql(&from, fields, where_clause, mode);
        let mut params = ordered_values(fields, values);
        params.extend_from_slice(where_params);
        self.ensure_open()?;
        self.remember(&sql);
        let outcome = self.connection.execute(&sql, &params).await?;
        Ok(outcome.rows_affected)
    }

    pub async fn add(
        &mut self,
        fields: &[String],
        values: &Record,
    ) -> Result<ExecOutcome, DriverError> {
        self.last_statement = None;
        let from = self.lib_name()?;
        let sql = statement::insert_sql(&from, fields);
        let params = ordered_values(fields, values);
        self.ensure_open()?;
        self.remember(&sql);
        self.connection.execute(&sql, &params).await
    }

    pub async fn remove(&mut self, where_clause: &str) -> Result<u64, DriverError> {
        self.last_statement = None;
        let from = self.lib_name()?;
        let sql = statement::delete_sql(&from, where_clause);
        self.ensure_open()?;
        self.remember(&sql);
        let outcome = self.connection.execute(&sql, &[]).await?;
        Ok(outcome.rows_affected)
    }

    /// Run a fully formed statement and return its rows
    pub async fn fetch_by_sql(&mut self, sql: &str) -> Result<Vec<Record>, DriverError> {
        self.last_statement = None;
        self.ensure_open()?;
        self.remember(sql);
        self.connection.fetch_all(sql, &[]).await
    }

    /// Ping, reconnecting on failure. Returns `true` when a reconnect happened.
    pub async fn check_ping(&mut self) -> Result<bool, DriverError> {
        self.ensure_open()?;
        if self.connection.ping().await {
            return Ok(false);
        }

        tracing::warn!(tag = %self.tag, "connection ping failed, reconnecting");
        self.connection.reconnect().await?;
        tracing::info!(tag = %self.tag, "connection re-established");
        Ok(true)
    }

    /// Close the physical connection; closing twice is a no-op
    pub async fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.connection.close().await
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed {
            Err(DriverError::Closed(self.tag.clone()))
        } else {
            Ok(())
        }
    }

    fn remember(&mut self, sql: &str) {
        crate::trace_log!("[{}] {}", self.tag, sql);
        self.last_statement = Some(sql.to_string());
    }
}

fn ordered_values(fields: &[String], values: &Record) -> Vec<Value> {
    fields
        .iter()
        .map(|f| values.get(f).cloned().unwrap_or(Value::Null))
        .collect()
}

fn count_of(row: &Record) -> i64 {
    let value = row
        .get("count")
        .or_else(|| row.values().next())
        .unwrap_or(&Value::Null);
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| u as i64))
            .unwrap_or(0),
        Value::String(s) => s.parse().unwrap_or(0),
        _ => 0,
    }
}
