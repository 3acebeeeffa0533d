use crate::consts::*;
use crate::state::{MiningRecord, MiningSettings};

/// Mining session state derived from the stored timestamps and a clock reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active { start: i64, end: i64 },
    Claimable { start: i64, end: i64 },
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn window(&self) -> Option<(i64, i64)> {
        match *self {
            SessionState::Idle => None,
            SessionState::Active { start, end } | SessionState::Claimable { start, end } => {
                Some((start, end))
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Inactive",
            SessionState::Active { .. } => "Active",
            SessionState::Claimable { .. } => "Ready to Claim",
        }
    }
}

/// Classify a record at `now`. A record with only one timestamp set is
/// malformed and treated as idle; it can never be claimed.
pub fn classify(record: &MiningRecord, now: i64) -> SessionState {
    match (record.mining_start_time, record.mining_end_time) {
        (Some(start), Some(end)) if now < end => SessionState::Active { start, end },
        (Some(start), Some(end)) => SessionState::Claimable { start, end },
        _ => SessionState::Idle,
    }
}

/// Amount accrued by `now` for the session in `record`.
pub fn earned(record: &MiningRecord, settings: &MiningSettings, now: i64) -> f64 {
    let Some(start) = record.mining_start_time else {
        return 0.0;
    };
    if record.mining_end_time.is_some_and(|end| now >= end) {
        return settings.total_reward;
    }

    let elapsed = (now - start).div_euclid(ONE_SECOND_MS).max(0);
    (elapsed as f64 * settings.reward_per_second()).min(settings.total_reward)
}

/// Whole seconds left until `end`, never negative.
pub fn remaining_seconds(end: i64, now: i64) -> i64 {
    (end - now).div_euclid(ONE_SECOND_MS).max(0)
}

/// The record that starting a session at `start` produces, or `None` when
/// the end time does not fit in an `i64`.
pub fn reserve(start: i64, settings: &MiningSettings) -> Option<MiningRecord> {
    let end = start.checked_add(settings.duration_ms())?;
    Some(MiningRecord::new(start, end))
}
