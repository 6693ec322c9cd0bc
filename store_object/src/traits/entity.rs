//! Entity trait
//!
//! An entity declares its table, its ordered field list and its primary key.
//! Values move in and out of it through serde, so any `Serialize +
//! Deserialize + Default` struct can be an entity.

use crate::errors::StoreError;
use connection_cache::Record;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt::Debug;

/// Application record type backed by one table.
///
/// Usually derived:
/// ```ignore
/// use entity_derive::Entity;
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize, Entity)]
/// #[entity(table = "users")]
/// pub struct User {
///     #[primary_key]
///     pub id: u64,
///     pub name: String,
///     pub status: i32,
/// }
/// ```
pub trait Entity:
    Clone + Send + Sync + Debug + Default + Serialize + DeserializeOwned + 'static
{
    /// The table name in the database
    fn table_name() -> &'static str;

    /// Declared fields, in insert/update order
    fn fields() -> &'static [&'static str];

    /// The primary key column
    fn primary_key() -> &'static str {
        "id"
    }

    /// Name the connection handle is bound to while serving this entity
    fn entity_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Initialization hook run on fresh entities before `add` and before a
    /// defaulted `update`. The default just assigns `attrs`.
    fn create(&mut self, attrs: Option<&Record>) -> Result<(), StoreError> {
        if let Some(attrs) = attrs {
            self.assign(attrs)?;
        }
        Ok(())
    }

    /// Overwrite the fields present in `attrs`; unknown keys are ignored
    fn assign(&mut self, attrs: &Record) -> Result<(), StoreError> {
        let mut current = serde_json::to_value(&*self)?;
        if let Value::Object(map) = &mut current {
            for (key, value) in attrs {
                map.insert(key.clone(), value.clone());
            }
        }
        *self = serde_json::from_value(current)?;
        Ok(())
    }

    /// Declared fields with their current values
    fn to_record(&self) -> Result<Record, StoreError> {
        let value = serde_json::to_value(self)?;
        let Value::Object(mut all) = value else {
            return Err(StoreError::InvalidArgument(format!(
                "{} does not serialize to an object",
                Self::entity_name()
            )));
        };

        Ok(Self::fields()
            .iter()
            .map(|f| (f.to_string(), all.remove(*f).unwrap_or(Value::Null)))
            .collect())
    }

    /// Current value of the primary key field
    fn primary_key_value(&self) -> Result<Value, StoreError> {
        let value = serde_json::to_value(self)?;
        value
            .get(Self::primary_key())
            .cloned()
            .ok_or_else(|| {
                StoreError::InvalidArgument(format!(
                    "{} has no primary key field '{}'",
                    Self::entity_name(),
                    Self::primary_key()
                ))
            })
    }

    /// Build an entity from a fetched row, starting from `Default`
    fn from_record(record: &Record) -> Result<Self, StoreError> {
        let mut entity = Self::default();
        entity.assign(record)?;
        Ok(entity)
    }
}
