//! In-memory driver for tests
//!
//! `MemoryDriver` records every statement with its bound parameters and
//! answers queries from a queue of scripted rows. When no rows are scripted
//! it falls back to tiny per-table row lists that understand the statements
//! assembled by [`ConnectionHandle`](crate::ConnectionHandle): inserts,
//! `WHERE 1` and `WHERE col=?` selects/updates/deletes, and `count(*)`.

use crate::driver::{Connection, Driver};
use crate::errors::DriverError;
use crate::params::{ExecOutcome, Record};
use async_trait::async_trait;
use config::DatabaseConfig;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// A statement as received by the driver
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub database: String,
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug)]
struct MemoryState {
    opens: usize,
    closes: usize,
    reconnects: usize,
    ping_ok: bool,
    fail_reconnect: bool,
    fail_open: bool,
    stalled: HashSet<String>,
    fail_next: Option<String>,
    statements: Vec<ExecutedStatement>,
    scripted: VecDeque<Vec<Record>>,
    tables: HashMap<String, Vec<Record>>,
    next_id: u64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            opens: 0,
            closes: 0,
            reconnects: 0,
            ping_ok: true,
            fail_reconnect: false,
            fail_open: false,
            stalled: HashSet::new(),
            fail_next: None,
            statements: Vec::new(),
            scripted: VecDeque::new(),
            tables: HashMap::new(),
            next_id: 1,
        }
    }
}

/// Recording driver backed by process memory; clones share state
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.state)
    }

    /// Queue rows returned by the next fetch, ahead of the table fallback
    pub fn push_rows(&self, rows: Vec<Record>) {
        self.state().scripted.push_back(rows);
    }

    /// Make the next statement fail with a backend error
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state().fail_next = Some(message.into());
    }

    pub fn set_ping_ok(&self, ok: bool) {
        self.state().ping_ok = ok;
    }

    pub fn set_fail_reconnect(&self, fail: bool) {
        self.state().fail_reconnect = fail;
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state().fail_open = fail;
    }

    /// Make `open` for `database` hang forever, like an unreachable server
    pub fn stall_open(&self, database: impl Into<String>) {
        self.state().stalled.insert(database.into());
    }

    pub fn statements(&self) -> Vec<ExecutedStatement> {
        self.state().statements.clone()
    }

    pub fn last_statement(&self) -> Option<ExecutedStatement> {
        self.state().statements.last().cloned()
    }

    pub fn open_count(&self) -> usize {
        self.state().opens
    }

    pub fn close_count(&self) -> usize {
        self.state().closes
    }

    pub fn reconnect_count(&self) -> usize {
        self.state().reconnects
    }

    /// Rows currently stored for `` `database`.`table` ``
    pub fn rows(&self, database: &str, table: &str) -> Vec<Record> {
        let key = crate::statement::qualified_table(database, table);
        self.state().tables.get(&key).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn open(&self, config: &DatabaseConfig) -> Result<Box<dyn Connection>, DriverError> {
        let stalled = self.state().stalled.contains(&config.database);
        if stalled {
            std::future::pending::<()>().await;
        }

        let mut state = self.state();
        if state.fail_open {
            return Err(DriverError::Backend(format!(
                "cannot connect to {}",
                config.host
            )));
        }
        state.opens += 1;
        Ok(Box::new(MemoryConnection {
            state: Arc::clone(&self.state),
            database: config.database.clone(),
        }))
    }
}

struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
    database: String,
}

impl MemoryConnection {
    fn begin(&self, sql: &str, params: &[Value]) -> Result<MutexGuard<'_, MemoryState>, DriverError> {
        let mut state = lock(&self.state);
        state.statements.push(ExecutedStatement {
            database: self.database.clone(),
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match state.fail_next.take() {
            Some(message) => Err(DriverError::Backend(message)),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn ping(&mut self) -> bool {
        lock(&self.state).ping_ok
    }

    async fn reconnect(&mut self) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        if state.fail_reconnect {
            return Err(DriverError::Backend("reconnect refused".to_string()));
        }
        state.reconnects += 1;
        state.ping_ok = true;
        Ok(())
    }

    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<Record>, DriverError> {
        let mut state = self.begin(sql, params)?;
        Ok(query(&mut state, sql, params).into_iter().next())
    }

    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Record>, DriverError> {
        let mut state = self.begin(sql, params)?;
        Ok(query(&mut state, sql, params))
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecOutcome, DriverError> {
        let mut state = self.begin(sql, params)?;
        Ok(execute(&mut state, sql, params))
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        lock(&self.state).closes += 1;
        Ok(())
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Parsed `WHERE` clause the fallback tables understand
enum Predicate {
    All,
    Eq(String, Value),
    Unknown,
}

fn parse_predicate(where_clause: &str, params: &[Value]) -> Predicate {
    let clause = where_clause.trim();
    if clause == "1" {
        return Predicate::All;
    }
    let clause = clause.strip_prefix("1 AND ").unwrap_or(clause).trim();
    match clause.strip_suffix('?') {
        Some(lhs) => {
            let lhs = lhs.trim_end();
            match lhs.strip_suffix('=') {
                Some(column) if !column.contains(' ') => {
                    let column = column.trim().trim_matches('`').to_string();
                    let value = params.last().cloned().unwrap_or(Value::Null);
                    Predicate::Eq(column, value)
                }
                _ => Predicate::Unknown,
            }
        }
        None => Predicate::Unknown,
    }
}

fn matches(row: &Record, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::All => true,
        Predicate::Eq(column, value) => row.get(column).is_some_and(|v| loose_eq(v, value)),
        Predicate::Unknown => false,
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    left == right || left.to_string().trim_matches('"') == right.to_string().trim_matches('"')
}

/// Split `<head> WHERE <predicate>[ ORDER BY ..][ LIMIT ..]`
fn split_where(sql: &str) -> (&str, &str) {
    match sql.split_once(" WHERE ") {
        Some((head, rest)) => {
            let end = [" ORDER BY ", " LIMIT "]
                .iter()
                .filter_map(|kw| rest.find(kw))
                .min()
                .unwrap_or(rest.len());
            (head, &rest[..end])
        }
        None => (sql, ""),
    }
}

fn table_after<'a>(head: &'a str, keyword: &str) -> Option<&'a str> {
    head.split_once(keyword)
        .and_then(|(_, rest)| rest.split_whitespace().next())
}

fn query(state: &mut MemoryState, sql: &str, params: &[Value]) -> Vec<Record> {
    if let Some(rows) = state.scripted.pop_front() {
        return rows;
    }

    let (head, where_clause) = split_where(sql);
    let Some(table) = table_after(head, " FROM ") else {
        return Vec::new();
    };
    let predicate = parse_predicate(where_clause, params);
    let rows: Vec<Record> = state
        .tables
        .get(table)
        .map(|rows| rows.iter().filter(|r| matches(r, &predicate)).cloned().collect())
        .unwrap_or_default();

    if head.starts_with("SELECT count(*)") {
        let mut count = Record::new();
        count.insert("count".to_string(), Value::from(rows.len() as u64));
        return vec![count];
    }
    rows
}

fn execute(state: &mut MemoryState, sql: &str, params: &[Value]) -> ExecOutcome {
    if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
        return insert(state, rest, params);
    }

    let (head, where_clause) = split_where(sql);
    if let Some(rest) = head.strip_prefix("UPDATE ") {
        let Some((table, sets)) = rest.split_once(" SET ") else {
            return ExecOutcome::default();
        };
        let columns: Vec<String> = sets
            .split(',')
            .filter_map(|s| s.split_once('='))
            .map(|(c, _)| c.trim().trim_matches('`').to_string())
            .collect();
        let delta = sets.contains("+?");
        let predicate = parse_predicate(where_clause, &params[columns.len().min(params.len())..]);
        let mut affected = 0;
        if let Some(rows) = state.tables.get_mut(table.trim()) {
            for row in rows.iter_mut().filter(|r| matches(r, &predicate)) {
                for (column, value) in columns.iter().zip(params) {
                    let next = if delta {
                        let current = row.get(column).and_then(Value::as_f64).unwrap_or(0.0);
                        let step = value.as_f64().unwrap_or(0.0);
                        Value::from(current + step)
                    } else {
                        value.clone()
                    };
                    row.insert(column.clone(), next);
                }
                affected += 1;
            }
        }
        return ExecOutcome {
            rows_affected: affected,
            last_insert_id: None,
        };
    }

    if let Some(table) = table_after(head, "DELETE FROM ") {
        let predicate = parse_predicate(where_clause, params);
        let mut affected = 0;
        if let Some(rows) = state.tables.get_mut(table) {
            let before = rows.len();
            rows.retain(|r| !matches(r, &predicate));
            affected = (before - rows.len()) as u64;
        }
        return ExecOutcome {
            rows_affected: affected,
            last_insert_id: None,
        };
    }

    ExecOutcome::default()
}

fn insert(state: &mut MemoryState, rest: &str, params: &[Value]) -> ExecOutcome {
    let Some((table, columns)) = rest.split_once(" (") else {
        return ExecOutcome::default();
    };
    let columns = columns.split(')').next().unwrap_or_default();

    let mut row = Record::new();
    for (column, value) in columns.split(',').zip(params) {
        row.insert(column.trim().trim_matches('`').to_string(), value.clone());
    }

    let id = match row.get("id") {
        Some(Value::Number(n)) if n.as_u64().unwrap_or(0) > 0 => n.as_u64().unwrap_or(0),
        _ => {
            let id = state.next_id;
            row.insert("id".to_string(), Value::from(id));
            id
        }
    };
    state.next_id = state.next_id.max(id + 1);
    state.tables.entry(table.to_string()).or_default().push(row);

    ExecOutcome {
        rows_affected: 1,
        last_insert_id: Some(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor() -> DatabaseConfig {
        DatabaseConfig::new(
            "localhost".to_string(),
            3306,
            "shop".to_string(),
            "root".to_string(),
            String::new(),
        )
    }

    #[tokio::test]
    async fn test_insert_then_select_by_column() {
        let driver = MemoryDriver::new();
        let mut conn = driver.open(&descriptor()).await.unwrap();

        let outcome = conn
            .execute(
                "INSERT INTO `shop`.`users` (`name`,`age`) VALUES (?,?)",
                &[json!("ann"), json!(31)],
            )
            .await
            .unwrap();
        assert_eq!(outcome.last_insert_id, Some(1));

        let row = conn
            .fetch_optional(
                "SELECT * FROM `shop`.`users` WHERE `id`=? LIMIT 1",
                &[json!(1)],
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row["name"], json!("ann"));
        assert_eq!(row["age"], json!(31));
    }

    #[tokio::test]
    async fn test_scripted_rows_take_priority() {
        let driver = MemoryDriver::new();
        let mut conn = driver.open(&descriptor()).await.unwrap();
        driver.push_rows(vec![json!({"a": 1}).as_object().unwrap().clone()]);

        let rows = conn.fetch_all("select whatever", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(conn.fetch_all("select whatever", &[]).await.unwrap().is_empty());
        assert_eq!(driver.statements().len(), 2);
    }

    #[tokio::test]
    async fn test_update_delta_and_delete() {
        let driver = MemoryDriver::new();
        let mut conn = driver.open(&descriptor()).await.unwrap();
        conn.execute(
            "INSERT INTO `shop`.`users` (`id`,`score`) VALUES (?,?)",
            &[json!(9), json!(10)],
        )
        .await
        .unwrap();

        let updated = conn
            .execute(
                "UPDATE `shop`.`users` SET `score`=`score`+? WHERE `id`=?",
                &[json!(5), json!(9)],
            )
            .await
            .unwrap();
        assert_eq!(updated.rows_affected, 1);
        assert_eq!(driver.rows("shop", "users")[0]["score"], json!(15.0));

        let deleted = conn
            .execute("DELETE FROM `shop`.`users` WHERE 1", &[])
            .await
            .unwrap();
        assert_eq!(deleted.rows_affected, 1);
        assert!(driver.rows("shop", "users").is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_scripted() {
        let driver = MemoryDriver::new();
        let mut conn = driver.open(&descriptor()).await.unwrap();
        driver.fail_next("deadlock");

        let result = conn.fetch_all("SELECT 1", &[]).await;
        assert!(matches!(result, Err(DriverError::Backend(msg)) if msg == "deadlock"));
        assert!(conn.fetch_all("SELECT 1", &[]).await.is_ok());

        driver.set_fail_open(true);
        assert!(driver.open(&descriptor()).await.is_err());
        assert_eq!(driver.open_count(), 1);
    }
}
