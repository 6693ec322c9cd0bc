//! Predicate compilation
//!
//! A [`Filter`] is either raw predicate text or an ordered list of
//! `column -> expression` pairs plus raw `union` fragments. Compilation is a
//! textual splice: nothing is escaped or parsed, so every expression and
//! fragment must already be safe SQL. Values that come from users belong in
//! bound parameters (see [`FetchOptions::params`](super::FetchOptions)).

use crate::errors::StoreError;
use serde_json::Value;
use std::fmt::Debug;

/// Key that carries raw fragments in a JSON filter description
pub const UNION_KEY: &str = "union";

/// Ordered column conditions plus raw fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    union: Vec<String>,
    columns: Vec<(String, String)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `AND <column> <expression>`, e.g. `column("age", ">18")`
    pub fn column(mut self, column: impl Into<String>, expression: impl Into<String>) -> Self {
        self.columns.push((column.into(), expression.into()));
        self
    }

    /// Raw fragment spliced before the column conditions. It must carry its
    /// own leading operator, e.g. `"OR vip = 1"`.
    pub fn union(mut self, fragment: impl Into<String>) -> Self {
        self.union.push(fragment.into());
        self
    }

    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    pub fn unions(&self) -> &[String] {
        &self.union
    }

    pub fn is_empty(&self) -> bool {
        self.union.is_empty() && self.columns.is_empty()
    }
}

/// Which rows an operation targets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Filter {
    /// Matches every row
    #[default]
    Empty,
    /// Trusted predicate text, used verbatim
    Raw(String),
    Conditions(Conditions),
}

impl Filter {
    pub fn raw(predicate: impl Into<String>) -> Self {
        Self::Raw(predicate.into())
    }

    /// Start a condition list with one column
    pub fn column(column: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::Conditions(Conditions::new().column(column, expression))
    }

    /// Add a column condition; a raw or empty filter becomes a condition list
    /// (raw text is kept as the first fragment)
    pub fn and(self, column: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::Conditions(self.into_conditions().column(column, expression))
    }

    /// Add a raw fragment
    pub fn union(self, fragment: impl Into<String>) -> Self {
        Self::Conditions(self.into_conditions().union(fragment))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Raw(text) => text.trim().is_empty(),
            Self::Conditions(conditions) => conditions.is_empty(),
        }
    }

    fn into_conditions(self) -> Conditions {
        match self {
            Self::Empty => Conditions::new(),
            Self::Raw(text) if text.trim().is_empty() => Conditions::new(),
            Self::Raw(text) => Conditions::new().union(format!("AND {}", text)),
            Self::Conditions(conditions) => conditions,
        }
    }
}

impl From<&str> for Filter {
    fn from(predicate: &str) -> Self {
        Self::Raw(predicate.to_string())
    }
}

impl From<String> for Filter {
    fn from(predicate: String) -> Self {
        Self::Raw(predicate)
    }
}

impl From<Conditions> for Filter {
    fn from(conditions: Conditions) -> Self {
        Self::Conditions(conditions)
    }
}

impl<F: Into<Filter>> From<Option<F>> for Filter {
    fn from(filter: Option<F>) -> Self {
        filter.map(Into::into).unwrap_or_default()
    }
}

/// Pairs in insertion order; a `"union"` key adds a raw fragment
impl<K, V> From<Vec<(K, V)>> for Filter
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        let conditions = pairs
            .into_iter()
            .fold(Conditions::new(), |conditions, (key, value)| {
                let key = key.into();
                if key == UNION_KEY {
                    conditions.union(value)
                } else {
                    conditions.column(key, value)
                }
            });
        Self::Conditions(conditions)
    }
}

/// Loosely structured JSON description: `null`, a predicate string, or an
/// object of `column: expression` with an optional `"union": [fragments]`
impl TryFrom<Value> for Filter {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::Empty),
            Value::String(text) => Ok(Self::Raw(text)),
            Value::Object(map) => {
                let mut conditions = Conditions::new();
                let mut union = None;
                for (key, value) in map {
                    if key == UNION_KEY {
                        union = Some(value);
                    } else {
                        conditions = conditions.column(key, splice_text(&value)?);
                    }
                }
                // Fragments always precede column conditions
                match union {
                    Some(Value::Array(fragments)) => {
                        let mut head = Conditions::new();
                        for fragment in fragments {
                            head = head.union(splice_text(&fragment)?);
                        }
                        head.columns = conditions.columns;
                        Ok(Self::Conditions(head))
                    }
                    Some(Value::String(fragment)) => {
                        let mut head = Conditions::new().union(fragment);
                        head.columns = conditions.columns;
                        Ok(Self::Conditions(head))
                    }
                    Some(Value::Null) | None => Ok(Self::Conditions(conditions)),
                    Some(other) => Err(StoreError::InvalidArgument(format!(
                        "'union' must be a list of fragments, got {}",
                        other
                    ))),
                }
            }
            other => Err(StoreError::InvalidArgument(format!(
                "filter must be null, a string or an object, got {}",
                other
            ))),
        }
    }
}

fn splice_text(value: &Value) -> Result<String, StoreError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        other => Err(StoreError::InvalidArgument(format!(
            "filter expressions must be text, got {}",
            other
        ))),
    }
}

/// Turns a filter into a boolean SQL expression.
///
/// Stores hold this behind `Arc<dyn PredicateCompiler>` so a parameterized
/// compiler can replace the textual one without touching callers.
pub trait PredicateCompiler: Send + Sync + Debug {
    fn compile(&self, filter: &Filter) -> String;
}

/// Textual splice compiler
///
/// - empty filter: `1`
/// - raw text: verbatim
/// - conditions: `1`, then each union fragment after a space, then
///   `AND <column> <expression>` per column in insertion order
#[derive(Debug, Clone, Copy, Default)]
pub struct TextualCompiler;

impl PredicateCompiler for TextualCompiler {
    fn compile(&self, filter: &Filter) -> String {
        match filter {
            _ if filter.is_empty() => "1".to_string(),
            Filter::Raw(text) => text.clone(),
            Filter::Conditions(conditions) => {
                let mut predicate = String::from("1");
                for fragment in &conditions.union {
                    predicate.push(' ');
                    predicate.push_str(fragment);
                }
                for (column, expression) in &conditions.columns {
                    predicate.push_str(" AND ");
                    predicate.push_str(column);
                    predicate.push(' ');
                    predicate.push_str(expression);
                }
                predicate
            }
            Filter::Empty => "1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(filter: impl Into<Filter>) -> String {
        TextualCompiler.compile(&filter.into())
    }

    #[test]
    fn test_empty_descriptions_match_everything() {
        assert_eq!(compile(Filter::Empty), "1");
        assert_eq!(compile(""), "1");
        assert_eq!(compile(Conditions::new()), "1");
        assert_eq!(compile(None::<&str>), "1");
        assert_eq!(compile(Vec::<(&str, &str)>::new()), "1");
    }

    #[test]
    fn test_raw_string_is_verbatim() {
        assert_eq!(compile("id=5"), "id=5");
        assert_eq!(compile("status in (1,2) or vip=1"), "status in (1,2) or vip=1");
    }

    #[test]
    fn test_columns_in_insertion_order() {
        let filter = Filter::column("status", "=1").and("age", ">18");
        assert_eq!(compile(filter), "1 AND status =1 AND age >18");

        let filter: Filter = vec![("b", "=2"), ("a", "=1")].into();
        assert_eq!(compile(filter), "1 AND b =2 AND a =1");
    }

    #[test]
    fn test_union_fragments_precede_columns_without_injected_and() {
        let filter = Filter::column("status", "=1")
            .union("OR vip = 1")
            .union("AND age BETWEEN 18 AND 30");
        assert_eq!(
            compile(filter),
            "1 OR vip = 1 AND age BETWEEN 18 AND 30 AND status =1"
        );

        let filter: Filter = vec![("status", "=1"), ("union", "OR vip = 1")].into();
        assert_eq!(compile(filter), "1 OR vip = 1 AND status =1");
    }

    #[test]
    fn test_operator_is_spliced_not_parsed() {
        assert_eq!(compile(Filter::column("price", ">10")), "1 AND price >10");
        assert_eq!(
            compile(Filter::column("name", "LIKE 'a%'")),
            "1 AND name LIKE 'a%'"
        );
    }

    #[test]
    fn test_raw_then_and_keeps_raw_text() {
        let filter = Filter::raw("deleted=0").and("status", "=1");
        assert_eq!(compile(filter), "1 AND deleted=0 AND status =1");
    }

    #[test]
    fn test_json_descriptions() {
        let filter = Filter::try_from(json!({
            "status": "=1",
            "union": ["OR vip = 1"],
            "age": ">18"
        }))
        .unwrap();
        assert_eq!(compile(filter), "1 OR vip = 1 AND status =1 AND age >18");

        assert_eq!(compile(Filter::try_from(json!("id=5")).unwrap()), "id=5");
        assert_eq!(compile(Filter::try_from(json!(null)).unwrap()), "1");
        assert_eq!(compile(Filter::try_from(json!({})).unwrap()), "1");
    }

    #[test]
    fn test_json_rejects_non_text_expressions() {
        assert!(matches!(
            Filter::try_from(json!({"status": ["=1"]})),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            Filter::try_from(json!(42)),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_is_empty() {
        assert!(Filter::Empty.is_empty());
        assert!(Filter::raw("  ").is_empty());
        assert!(!Filter::raw("id=5").is_empty());
        assert!(!Filter::from(Conditions::new().union("OR 1")).is_empty());
    }
}
