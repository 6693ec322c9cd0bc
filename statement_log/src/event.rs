//! Statement record definitions
//!
//! This module defines the structure of the records that flow through
//! the statement log.

use serde::{Deserialize, Serialize};

/// Channel used for executed SQL statements
pub const SQL_CHANNEL: &str = "sql";

/// One recorded message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    /// Channel the message was recorded on
    pub channel: String,
    /// Statement text (or any diagnostic message)
    pub message: String,
    /// Record timestamp (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl StatementRecord {
    pub fn new(message: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            message: message.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Whether this record was written on the SQL channel
    pub fn is_sql(&self) -> bool {
        self.channel == SQL_CHANNEL
    }
}
