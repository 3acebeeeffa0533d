use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::MiningError;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MiningSettings {
    /// Session length in hours.
    pub mining_duration: f64,
    /// Points credited for one full session.
    pub total_reward: f64,
}

impl Default for MiningSettings {
    fn default() -> Self {
        Self {
            mining_duration: DEFAULT_MINING_DURATION_HOURS,
            total_reward: DEFAULT_TOTAL_REWARD,
        }
    }
}

impl MiningSettings {
    pub fn duration_ms(&self) -> i64 {
        (self.mining_duration * ONE_HOUR_MS as f64).round() as i64
    }

    pub fn duration_seconds(&self) -> f64 {
        self.mining_duration * SECONDS_PER_HOUR as f64
    }

    pub fn reward_per_second(&self) -> f64 {
        self.total_reward / self.duration_seconds()
    }

    pub fn reward_per_hour(&self) -> f64 {
        self.total_reward / self.mining_duration
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferralSettings {
    pub referral_bonus: f64,
    pub referral_milestone: u64,
}

impl Default for ReferralSettings {
    fn default() -> Self {
        Self {
            referral_bonus: DEFAULT_REFERRAL_BONUS,
            referral_milestone: DEFAULT_REFERRAL_MILESTONE,
        }
    }
}

/// Application settings as stored under the `settings` key. Missing fields
/// fall back to the defaults, so a partial document merges over them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub mining: MiningSettings,
    pub referral: ReferralSettings,
}

impl AppSettings {
    pub fn validate(&self) -> Result<(), MiningError> {
        let m = &self.mining;
        if !(m.mining_duration.is_finite() && m.mining_duration > 0.0) {
            return Err(MiningError::InvalidSettings(format!(
                "miningDuration must be positive, got {}",
                m.mining_duration
            )));
        }
        if m.mining_duration > MAX_MINING_DURATION_HOURS {
            return Err(MiningError::InvalidSettings(format!(
                "miningDuration must be at most {} hours, got {}",
                MAX_MINING_DURATION_HOURS, m.mining_duration
            )));
        }
        if !(m.total_reward.is_finite() && m.total_reward > 0.0) {
            return Err(MiningError::InvalidSettings(format!(
                "totalReward must be positive, got {}",
                m.total_reward
            )));
        }
        if self.referral.referral_milestone == 0 {
            return Err(MiningError::InvalidSettings(
                "referralMilestone must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_merges_over_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"mining":{"totalReward":12}}"#).unwrap();
        assert_eq!(settings.mining.total_reward, 12.0);
        assert_eq!(settings.mining.mining_duration, DEFAULT_MINING_DURATION_HOURS);
        assert_eq!(settings.referral, ReferralSettings::default());
    }

    #[test]
    fn duration_conversions() {
        let m = MiningSettings::default();
        assert_eq!(m.duration_ms(), 28_800_000);
        assert_eq!(m.duration_seconds(), 28_800.0);
        assert!((m.reward_per_hour() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_values() {
        let mut settings = AppSettings::default();
        assert!(settings.validate().is_ok());

        settings.mining.mining_duration = 0.0;
        assert!(matches!(settings.validate(), Err(MiningError::InvalidSettings(_))));

        settings.mining.mining_duration = 8.0;
        settings.mining.total_reward = -1.0;
        assert!(matches!(settings.validate(), Err(MiningError::InvalidSettings(_))));
    }

    #[test]
    fn rejects_durations_past_the_cap() {
        let mut settings = AppSettings::default();
        settings.mining.mining_duration = MAX_MINING_DURATION_HOURS;
        assert!(settings.validate().is_ok());

        settings.mining.mining_duration = 3.0e12;
        assert!(matches!(settings.validate(), Err(MiningError::InvalidSettings(_))));
    }
}
