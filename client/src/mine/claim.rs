use farm_api::prelude::*;
use log::{info, warn};

use super::controller::MiningController;
use super::referral::check_referral_milestones;
use crate::clock::Clock;
use crate::hooks::Severity;
use crate::store::UserStore;

/// What a claim attempt did.
#[derive(Clone, Debug, PartialEq)]
pub struct ClaimOutcome {
    pub credited: bool,
    pub amount: f64,
    pub error: Option<MiningError>,
}

/// A committed claim.
#[derive(Clone, Debug, PartialEq)]
pub struct ClaimReceipt {
    pub amount: f64,
    pub balance: f64,
    pub total_mined: f64,
    pub referred: bool,
    /// Log entry id; `None` when the advisory log append failed.
    pub transaction_id: Option<String>,
}

impl<S: UserStore, C: Clock> MiningController<S, C> {
    /// Claim a matured session and run the post-claim collaborators.
    /// Every failure is reported to the UI sink; nothing propagates.
    pub async fn claim(&self) -> ClaimOutcome {
        let receipt = match self.try_claim().await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.report(&e);
                return ClaimOutcome {
                    credited: false,
                    amount: 0.0,
                    error: Some(e),
                };
            }
        };

        let settings = self.settings();
        self.ui.notify(
            &format!("Claimed {}!", format_amount(receipt.amount)),
            Severity::Success,
        );
        self.hooks.show_ad();

        if receipt.referred {
            if let Some(user_id) = self.user_id() {
                if let Err(e) =
                    check_referral_milestones(self.store.as_ref(), user_id, &settings.referral).await
                {
                    warn!("referral milestone check for {} failed: {}", user_id, e);
                }
            }
        }

        if let Some(user_id) = self.user_id() {
            self.events.send(&AnalyticsEvent::MiningClaimed {
                user_id: user_id.to_string(),
                amount: receipt.amount,
                timestamp: self.now(),
            });
        }

        ClaimOutcome {
            credited: true,
            amount: receipt.amount,
            error: None,
        }
    }

    /// Credit the session reward exactly once. The credit and the reset to
    /// idle happen in one compare-and-set, so of several racing claims only
    /// one can commit; the rest observe the idle document and abort.
    pub async fn try_claim(&self) -> Result<ClaimReceipt, MiningError> {
        let user_id = self.require_user()?;
        let now = self.now();
        let reward = self.settings().mining.total_reward;

        let mut rejection = None;
        let commit = self
            .guard(self.store.atomic_update(user_id, |doc, _server_now| {
                let Some(doc) = doc else {
                    rejection = Some(ClaimRejection::MissingDocument);
                    return None;
                };
                match classify(&doc.mining_record(), now) {
                    SessionState::Idle => {
                        rejection = Some(ClaimRejection::NoSession);
                        None
                    }
                    SessionState::Active { .. } => {
                        rejection = Some(ClaimRejection::NotMatured);
                        None
                    }
                    SessionState::Claimable { .. } => {
                        rejection = None;
                        let mut next = doc.clone();
                        next.balance += reward;
                        next.total_mined += reward;
                        next.set_mining_record(MiningRecord::IDLE);
                        Some(next)
                    }
                }
            }))
            .await
            .map_err(|e| MiningError::ClaimTransportFailure(e.to_string()))?;

        let doc = match commit.snapshot {
            Some(doc) if commit.committed => doc,
            _ => {
                let reason = rejection.unwrap_or(ClaimRejection::NoSession);
                info!("claim for {} declined: {}", user_id, reason);
                return Err(MiningError::ClaimNotReady(reason));
            }
        };
        info!("{} claimed {} (balance {})", user_id, reward, doc.balance);

        self.updater.stop();
        self.ui.set_session_state(SessionState::Idle);
        self.ui.set_remaining_display(START_LABEL);

        let transaction_id = match self
            .guard(self.store.append(user_id, LogEntry::mining(reward)))
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                self.report(&MiningError::TransactionLogWriteFailure(e.to_string()));
                None
            }
        };

        Ok(ClaimReceipt {
            amount: reward,
            balance: doc.balance,
            total_mined: doc.total_mined,
            referred: doc.is_referred(),
            transaction_id,
        })
    }
}
