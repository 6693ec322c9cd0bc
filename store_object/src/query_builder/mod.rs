//! Query builder utilities
//!
//! This module turns filter and union descriptions into SQL text.

pub mod options;
pub mod predicate;
pub mod union;

// Re-export main types
pub use options::FetchOptions;
pub use predicate::{Conditions, Filter, PredicateCompiler, TextualCompiler};
pub use union::UnionQuery;
