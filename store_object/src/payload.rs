//! Input of `update` and `add`: a typed entity or raw column values

use crate::traits::Entity;
use connection_cache::Record;

/// Either an entity instance or a raw `column -> value` mapping
#[derive(Debug, Clone)]
pub enum Payload<T: Entity> {
    Entity(T),
    Fields(Record),
}

impl<T: Entity> Payload<T> {
    /// An empty mapping; `update` and `add` start from a fresh entity
    pub fn empty() -> Self {
        Self::Fields(Record::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Fields(fields) if fields.is_empty())
    }
}

impl<T: Entity> Default for Payload<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Entity> From<T> for Payload<T> {
    fn from(entity: T) -> Self {
        Self::Entity(entity)
    }
}

impl<T: Entity> From<Record> for Payload<T> {
    fn from(fields: Record) -> Self {
        Self::Fields(fields)
    }
}
