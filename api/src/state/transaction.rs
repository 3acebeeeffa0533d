use serde::{Deserialize, Serialize};

use crate::consts::*;

/// A transaction log entry as submitted by a client. The store stamps it with
/// its own clock when appending.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub description: String,
    pub status: String,
}

impl LogEntry {
    pub fn mining(amount: f64) -> Self {
        Self {
            kind: TX_TYPE_MINING.to_string(),
            amount,
            description: TX_DESCRIPTION_MINING.to_string(),
            status: TX_STATUS_COMPLETED.to_string(),
        }
    }

    pub fn stamp(self, timestamp: i64) -> TransactionRecord {
        TransactionRecord {
            kind: self.kind,
            amount: self.amount,
            description: self.description,
            timestamp,
            status: self.status,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub description: String,
    pub timestamp: i64,
    pub status: String,
}
