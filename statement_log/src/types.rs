//! Type definitions for the statement log

use crate::event::StatementRecord;

/// Subscriber invoked synchronously for every recorded statement
pub type RecordCallback = Box<dyn Fn(&StatementRecord) + Send + Sync>;
