//! Convenience re-exports for common statement-log usage

pub use crate::event::{StatementRecord, SQL_CHANNEL};
pub use crate::manager::StatementLog;
pub use crate::types::RecordCallback;
