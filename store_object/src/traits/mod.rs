//! Traits for database operations
//!
//! This module contains the traits that define the entity shape and the
//! generic CRUD contract of an entity store.

pub mod core;
pub mod entity;

// Re-export all public items for convenience
pub use self::core::StoreObject;
pub use self::entity::Entity;
