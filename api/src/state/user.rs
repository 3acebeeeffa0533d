use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::TransactionRecord;

/// The mining subset of a user document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MiningRecord {
    pub mining_start_time: Option<i64>,
    pub mining_end_time: Option<i64>,
}

impl MiningRecord {
    pub const IDLE: MiningRecord = MiningRecord {
        mining_start_time: None,
        mining_end_time: None,
    };

    pub fn new(start: i64, end: i64) -> Self {
        Self {
            mining_start_time: Some(start),
            mining_end_time: Some(end),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Referral {
    pub joined_at: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Milestone {
    pub reached: i64,
    pub bonus: f64,
}

/// A user document as held by the store. Fields this crate does not know
/// about are kept in `extra` and written back untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDocument {
    pub balance: f64,
    pub total_mined: f64,
    pub mining_start_time: Option<i64>,
    pub mining_end_time: Option<i64>,

    pub referral_code: Option<String>,
    pub referred_by: Option<String>,
    pub referrals: BTreeMap<String, Referral>,
    pub referral_rewards: f64,
    pub referral_milestones: BTreeMap<String, Milestone>,

    pub transactions: BTreeMap<String, TransactionRecord>,
    pub created_at: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserDocument {
    /// A freshly registered user: zero balances, idle, empty maps.
    pub fn new_user(referral_code: String, referred_by: Option<String>, created_at: i64) -> Self {
        Self {
            referral_code: Some(referral_code),
            referred_by,
            created_at: Some(created_at),
            ..Self::default()
        }
    }

    pub fn mining_record(&self) -> MiningRecord {
        MiningRecord {
            mining_start_time: self.mining_start_time,
            mining_end_time: self.mining_end_time,
        }
    }

    pub fn set_mining_record(&mut self, record: MiningRecord) {
        self.mining_start_time = record.mining_start_time;
        self.mining_end_time = record.mining_end_time;
    }

    pub fn is_referred(&self) -> bool {
        self.referred_by.as_deref().is_some_and(|r| !r.is_empty())
    }

    pub fn referral_count(&self) -> u64 {
        self.referrals.len() as u64
    }
}
