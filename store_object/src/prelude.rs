//! Convenience re-exports for common store-object usage

// Core traits
pub use crate::traits::{Entity, StoreObject};

// Error types
pub use crate::errors::StoreError;

// Core store functionality
pub use crate::generic_store::EntityStore;
pub use crate::payload::Payload;

// Query building
pub use crate::query_builder::{Conditions, FetchOptions, Filter, UnionQuery};

// Validation
pub use crate::validation::{ValidatedTableName, ValidationError};

// Row and update types from the connection layer
pub use connection_cache::{Record, UpdateMode};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
