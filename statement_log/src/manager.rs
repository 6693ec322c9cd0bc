use crate::event::StatementRecord;
use crate::types::RecordCallback;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Fire-and-forget log of executed statements
pub struct StatementLog {
    callbacks: RwLock<Vec<RecordCallback>>,
    last: RwLock<HashMap<String, StatementRecord>>,
    recorded: AtomicU64,
}

impl std::fmt::Debug for StatementLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementLog")
            .field("callback_count", &self.callback_count())
            .field("recorded", &self.recorded_count())
            .finish()
    }
}

impl StatementLog {
    pub fn new() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
            last: RwLock::new(HashMap::new()),
            recorded: AtomicU64::new(0),
        }
    }

    /// Add subscriber callback
    pub fn add_callback<F>(&self, callback: F)
    where
        F: Fn(&StatementRecord) + Send + Sync + 'static,
    {
        if let Ok(mut callbacks) = self.callbacks.write() {
            callbacks.push(Box::new(callback));
        }
    }

    /// Record a message on a channel.
    ///
    /// Never fails and never panics: lock poisoning is ignored and a
    /// panicking subscriber is logged and skipped.
    pub fn record(&self, message: impl Into<String>, channel: &str) {
        let record = StatementRecord::new(message, channel);
        tracing::info!(target: "daobase::sql", channel = %record.channel, statement = %record.message);

        self.recorded.fetch_add(1, Ordering::Relaxed);

        if let Ok(callbacks) = self.callbacks.read() {
            for (index, callback) in callbacks.iter().enumerate() {
                if catch_unwind(AssertUnwindSafe(|| callback(&record))).is_err() {
                    tracing::warn!(callback_index = index, "statement log subscriber panicked");
                }
            }
        }

        if let Ok(mut last) = self.last.write() {
            last.insert(record.channel.clone(), record);
        }
    }

    /// Most recent record on a channel
    pub fn last(&self, channel: &str) -> Option<StatementRecord> {
        self.last.read().ok()?.get(channel).cloned()
    }

    /// Most recent message text on a channel
    pub fn last_message(&self, channel: &str) -> Option<String> {
        self.last(channel).map(|record| record.message)
    }

    /// Total number of records since creation
    pub fn recorded_count(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }

    /// Clear all callbacks
    pub fn clear_callbacks(&self) {
        if let Ok(mut callbacks) = self.callbacks.write() {
            callbacks.clear();
        }
    }

    /// Get number of registered callbacks
    pub fn callback_count(&self) -> usize {
        self.callbacks.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for StatementLog {
    fn default() -> Self {
        Self::new()
    }
}
