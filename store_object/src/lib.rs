//! Store Object - entity stores for daobase
//!
//! This crate provides the entity contract, the predicate and union
//! compilers, the result finalizer and the generic [`EntityStore`] that
//! implements the CRUD surface on top of the connection cache.

// Lets `#[derive(Entity)]` output resolve inside this crate too
extern crate self as store_object;

pub mod errors;
pub mod finalizer;
pub mod generic_store;
pub mod payload;
pub mod prelude;
pub mod query_builder;
pub mod traits;
pub mod validation;

pub use connection_cache::{Record, UpdateMode};
pub use errors::StoreError;
pub use finalizer::ResultFinalizer;
pub use generic_store::EntityStore;
pub use payload::Payload;
pub use query_builder::{
    Conditions, FetchOptions, Filter, PredicateCompiler, TextualCompiler, UnionQuery,
};
pub use traits::{Entity, StoreObject};
pub use validation::{ValidatedTableName, ValidationError};
