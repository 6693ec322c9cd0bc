//! Optional arguments of the fetch operations

use serde_json::Value;

/// Bound parameters, projection, ordering and row window for a fetch.
///
/// `start` only takes effect together with `limit`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub params: Vec<Value>,
    pub fields: String,
    pub order_by: Option<String>,
    pub start: Option<u64>,
    pub limit: Option<u64>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            params: Vec::new(),
            fields: "*".to_string(),
            order_by: None,
            start: None,
            limit: None,
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values for `?` placeholders in the predicate, in order
    pub fn params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    pub fn param(mut self, param: impl Into<Value>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Projected columns, e.g. `"id,name"`
    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = fields.into();
        self
    }

    /// Raw ORDER BY body, e.g. `"id desc"`
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn start(mut self, start: u64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_select_everything() {
        let options = FetchOptions::default();
        assert_eq!(options.fields, "*");
        assert!(options.params.is_empty());
        assert_eq!(options.order_by, None);
        assert_eq!(options.limit, None);
    }

    #[test]
    fn test_builder() {
        let options = FetchOptions::new()
            .param(5)
            .param("ann")
            .fields("id,name")
            .order_by("id desc")
            .start(20)
            .limit(10);
        assert_eq!(options.params, vec![json!(5), json!("ann")]);
        assert_eq!(options.fields, "id,name");
        assert_eq!(options.order_by.as_deref(), Some("id desc"));
        assert_eq!((options.start, options.limit), (Some(20), Some(10)));
    }
}
