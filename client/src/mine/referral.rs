use farm_api::prelude::*;
use log::{debug, info};

use crate::store::{StoreError, UserStore};

/// Award the next referral milestone bonus if one has been reached and not
/// yet recorded. With `n` referrals and milestone size `m`, the reached
/// level is `n / m` and its bonus is `m * referral_bonus`.
///
/// Runs as a compare-and-set so a milestone is recorded at most once.
pub async fn check_referral_milestones<S: UserStore>(
    store: &S,
    user_id: &str,
    settings: &ReferralSettings,
) -> Result<Option<(u64, Milestone)>, StoreError> {
    let step = settings.referral_milestone.max(1);
    let bonus = step as f64 * settings.referral_bonus;
    let mut awarded = None;

    let commit = store
        .atomic_update(user_id, |doc, server_now| {
            awarded = None;
            let doc = doc?;
            let level = doc.referral_count() / step;
            if level == 0 || doc.referral_milestones.contains_key(&level.to_string()) {
                return None;
            }

            let milestone = Milestone { reached: server_now, bonus };
            let mut next = doc.clone();
            next.referral_milestones.insert(level.to_string(), milestone.clone());
            next.referral_rewards += bonus;
            awarded = Some((level, milestone));
            Some(next)
        })
        .await?;

    if !commit.committed {
        debug!("no new referral milestone for {}", user_id);
        return Ok(None);
    }
    if let Some((level, milestone)) = &awarded {
        info!("{} reached referral milestone {} (+{})", user_id, level, milestone.bonus);
    }
    Ok(awarded)
}
