//! Statement parameters shared by handles and drivers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row, keyed by column name in select order
pub type Record = Map<String, Value>;

/// How update values are applied to the target columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateMode {
    /// `col = value`
    #[default]
    Absolute,
    /// `col = col + value`
    Delta,
}

impl UpdateMode {
    /// Legacy integer flag: zero means absolute, anything else delta
    pub fn from_flag(flag: i32) -> Self {
        if flag == 0 {
            Self::Absolute
        } else {
            Self::Delta
        }
    }
}

/// Outcome of a statement that does not return rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    pub last_insert_id: Option<u64>,
}
