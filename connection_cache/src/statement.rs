//! SQL statement assembly for handle operations
//!
//! Predicates arrive as already-compiled text and are spliced verbatim.
//! Values are never spliced: they are bound through `?` placeholders.

use crate::params::UpdateMode;

/// Quote an identifier with backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Qualified `` `database`.`table` `` reference
pub fn qualified_table(database: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(database), quote_identifier(table))
}

/// Row window appended to a SELECT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(u64),
    Range { start: u64, count: u64 },
}

/// SELECT statement over a single table reference
#[derive(Debug, Clone)]
pub struct Select<'a> {
    pub fields: &'a str,
    pub from: &'a str,
    pub where_clause: &'a str,
    pub order_by: Option<&'a str>,
    pub limit: Option<Limit>,
}

impl<'a> Select<'a> {
    pub fn new(fields: &'a str, from: &'a str, where_clause: &'a str) -> Self {
        Self {
            fields,
            from,
            where_clause,
            order_by: None,
            limit: None,
        }
    }

    pub fn order_by(mut self, order_by: Option<&'a str>) -> Self {
        self.order_by = order_by.filter(|o| !o.trim().is_empty());
        self
    }

    pub fn limit(mut self, limit: Option<Limit>) -> Self {
        self.limit = limit;
        self
    }

    pub fn to_sql(&self) -> String {
        let fields = if self.fields.trim().is_empty() {
            "*"
        } else {
            self.fields
        };
        let mut sql = format!(
            "SELECT {} FROM {} WHERE {}",
            fields,
            self.from,
            where_or_all(self.where_clause)
        );

        if let Some(order_by) = self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }

        match self.limit {
            Some(Limit::Count(count)) => sql.push_str(&format!(" LIMIT {}", count)),
            Some(Limit::Range { start, count }) => {
                sql.push_str(&format!(" LIMIT {},{}", start, count))
            }
            None => {}
        }

        sql
    }
}

/// `SELECT count(*) as count FROM ... WHERE ...`
pub fn count_sql(from: &str, where_clause: &str) -> String {
    format!(
        "SELECT count(*) as count FROM {} WHERE {}",
        from,
        where_or_all(where_clause)
    )
}

/// `INSERT INTO ... (`a`,`b`) VALUES (?,?)`
pub fn insert_sql(from: &str, fields: &[String]) -> String {
    let columns = fields
        .iter()
        .map(|f| quote_identifier(f))
        .collect::<Vec<_>>()
        .join(",");
    let placeholders = vec!["?"; fields.len()].join(",");
    format!("INSERT INTO {} ({}) VALUES ({})", from, columns, placeholders)
}

/// `UPDATE ... SET `a`=?,`b`=? WHERE ...`, or `` `a`=`a`+? `` in delta mode
pub fn update_sql(from: &str, fields: &[String], where_clause: &str, mode: UpdateMode) -> String {
    let sets = fields
        .iter()
        .map(|f| {
            let column = quote_identifier(f);
            match mode {
                UpdateMode::Absolute => format!("{}=?", column),
                UpdateMode::Delta => format!("{}={}+?", column, column),
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "UPDATE {} SET {} WHERE {}",
        from,
        sets,
        where_or_all(where_clause)
    )
}

/// `DELETE FROM ... WHERE ...`
pub fn delete_sql(from: &str, where_clause: &str) -> String {
    format!("DELETE FROM {} WHERE {}", from, where_clause)
}

fn where_or_all(where_clause: &str) -> &str {
    if where_clause.trim().is_empty() {
        "1"
    } else {
        where_clause
    }
}
