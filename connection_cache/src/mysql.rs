//! MySQL driver on sqlx
//!
//! Values bind positionally from JSON; columns decode back into JSON by
//! trying the common Rust types in turn. A column type with no mapping is an
//! error, never a silent NULL.

use crate::driver::{Connection, Driver};
use crate::errors::DriverError;
use crate::params::{ExecOutcome, Record};
use async_trait::async_trait;
use config::DatabaseConfig;
use serde_json::Value;
use rust_decimal::prelude::ToPrimitive;
use sqlx::mysql::{MySqlArguments, MySqlColumn, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::types::{Decimal, JsonValue};
use sqlx::{Column, ConnectOptions, Connection as _, MySql, Row, TypeInfo};
use std::time::Duration;

/// Opens one `MySqlConnection` per tag
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl MySqlDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    async fn open(&self, config: &DatabaseConfig) -> Result<Box<dyn Connection>, DriverError> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database)
            .charset(&config.charset);
        let timeout = Duration::from_secs(config.connect_timeout_seconds);

        let connection = connect(&options, timeout).await?;
        tracing::debug!(host = %config.host, database = %config.database, "mysql connection opened");

        Ok(Box::new(MySqlLink {
            database: config.database.clone(),
            options,
            timeout,
            connection: Some(connection),
        }))
    }
}

async fn connect(
    options: &MySqlConnectOptions,
    timeout: Duration,
) -> Result<MySqlConnection, DriverError> {
    match tokio::time::timeout(timeout, options.connect()).await {
        Ok(connection) => Ok(connection?),
        Err(_) => Err(DriverError::ConnectTimeout(timeout.as_secs())),
    }
}

struct MySqlLink {
    database: String,
    options: MySqlConnectOptions,
    timeout: Duration,
    connection: Option<MySqlConnection>,
}

impl MySqlLink {
    fn connection(&mut self) -> Result<&mut MySqlConnection, DriverError> {
        self.connection
            .as_mut()
            .ok_or_else(|| DriverError::Closed(self.database.clone()))
    }
}

#[async_trait]
impl Connection for MySqlLink {
    async fn ping(&mut self) -> bool {
        match self.connection.as_mut() {
            Some(connection) => connection.ping().await.is_ok(),
            None => false,
        }
    }

    async fn reconnect(&mut self) -> Result<(), DriverError> {
        if let Some(old) = self.connection.take() {
            // The old link is usually already dead; a failed goodbye is expected
            let _ = old.close().await;
        }
        self.connection = Some(connect(&self.options, self.timeout).await?);
        Ok(())
    }

    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<Record>, DriverError> {
        let connection = self.connection()?;
        let row = bind_all(sqlx::query(sql), params)
            .fetch_optional(&mut *connection)
            .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Record>, DriverError> {
        let connection = self.connection()?;
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&mut *connection)
            .await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecOutcome, DriverError> {
        let connection = self.connection()?;
        let result = bind_all(sqlx::query(sql), params)
            .execute(&mut *connection)
            .await?;
        let last_insert_id = match result.last_insert_id() {
            0 => None,
            id => Some(id),
        };
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id,
        })
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if let Some(connection) = self.connection.take() {
            connection.close().await?;
        }
        Ok(())
    }
}

fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[Value],
) -> Query<'q, MySql, MySqlArguments> {
    for value in params {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query.bind(i)
                } else if let Some(u) = n.as_u64() {
                    query.bind(u)
                } else {
                    query.bind(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => query.bind(s.clone()),
            other => query.bind(other.to_string()),
        };
    }
    query
}

fn row_to_record(row: &MySqlRow) -> Result<Record, DriverError> {
    let mut record = Record::new();
    for column in row.columns() {
        record.insert(column.name().to_string(), decode_column(row, column)?);
    }
    Ok(record)
}

fn decode_column(row: &MySqlRow, column: &MySqlColumn) -> Result<Value, DriverError> {
    let index = column.ordinal();
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return Ok(v.map(Value::from).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(index) {
        return Ok(v.map(Value::from).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return Ok(v.map(Value::from).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
        return Ok(v.map(|f| Value::from(f as f64)).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<Decimal>, _>(index) {
        return Ok(v.map(decimal_to_json).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return Ok(v.map(Value::from).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
        return Ok(v
            .map(|t| Value::from(t.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(index) {
        return Ok(v.map(|d| Value::from(d.to_string())).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(index) {
        return Ok(v
            .map(|t| Value::from(t.format("%H:%M:%S").to_string()))
            .unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<JsonValue>, _>(index) {
        return Ok(v.unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return Ok(v
            .map(|bytes| Value::from(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null));
    }

    crate::debug_log!("column {} has no JSON mapping", column.name());
    Err(DriverError::UnsupportedColumn {
        column: column.name().to_string(),
        type_name: column.type_info().name().to_string(),
    })
}

/// Whole decimals become integers, others the nearest float; text only when
/// neither fits
fn decimal_to_json(value: Decimal) -> Value {
    if value.fract().is_zero() {
        if let Some(i) = value.to_i64() {
            return Value::from(i);
        }
    }
    match value.to_f64().and_then(serde_json::Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::from(value.to_string()),
    }
}
