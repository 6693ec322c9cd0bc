//! Statement log for executed SQL
//!
//! This crate records the text of executed statements on named channels,
//! keeps the most recent one per channel for diagnostics and fans records
//! out to subscribers.

pub mod event;
pub mod manager;
pub mod prelude;
pub mod types;

pub use event::{StatementRecord, SQL_CHANNEL};
pub use manager::StatementLog;
pub use types::RecordCallback;
