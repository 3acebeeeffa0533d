use serde::{Deserialize, Serialize};

/// Analytics events forwarded to the host platform after mining actions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    #[serde(rename_all = "camelCase")]
    MiningStarted { user_id: String, timestamp: i64 },
    #[serde(rename_all = "camelCase")]
    MiningClaimed {
        user_id: String,
        amount: f64,
        timestamp: i64,
    },
}
