//! Multi-table SELECT composition
//!
//! A [`UnionQuery`] lists tables with their columns, raw join/filter
//! fragments and an optional raw order suffix. Tables are cross joined in
//! the FROM list, so join conditions must be given as fragments.

use crate::errors::StoreError;

/// Description of a flat multi-table SELECT
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnionQuery {
    pub fields: Vec<(String, Vec<String>)>,
    pub wheres: Vec<String>,
    pub order: Option<String>,
}

impl UnionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `columns` from `table`; tables keep the order they are added in
    pub fn table<I, S>(mut self, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .push((table.into(), columns.into_iter().map(Into::into).collect()));
        self
    }

    /// Raw fragment ANDed onto the predicate, e.g. `"a.id=b.a_id"`
    pub fn condition(mut self, fragment: impl Into<String>) -> Self {
        self.wheres.push(fragment.into());
        self
    }

    /// Raw suffix appended verbatim after the predicate, e.g. `" order by a.id desc"`
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Render against `database`:
    /// `select t.a,t.b from db.t where 1 and <fragment>...<order>`
    pub fn to_sql(&self, database: &str) -> Result<String, StoreError> {
        let columns: Vec<String> = self
            .fields
            .iter()
            .flat_map(|(table, columns)| columns.iter().map(move |c| format!("{}.{}", table, c)))
            .collect();
        if columns.is_empty() {
            return Err(StoreError::InvalidArgument(
                "union query selects no columns".to_string(),
            ));
        }

        let tables: Vec<String> = self
            .fields
            .iter()
            .map(|(table, _)| format!("{}.{}", database, table))
            .collect();

        let mut predicate = String::from("1");
        for fragment in &self.wheres {
            predicate.push_str(" and ");
            predicate.push_str(fragment);
        }

        Ok(format!(
            "select {} from {} where {}{}",
            columns.join(","),
            tables.join(","),
            predicate,
            self.order.as_deref().unwrap_or_default()
        ))
    }
}
