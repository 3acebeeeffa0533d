use farm_api::prelude::*;
use log::{debug, error, info};

use super::controller::MiningController;
use crate::clock::Clock;
use crate::hooks::Severity;
use crate::store::UserStore;

impl<S: UserStore, C: Clock> MiningController<S, C> {
    /// Start a session. Failures are reported to the UI sink and returned.
    pub async fn start(&self) -> Result<MiningRecord, MiningError> {
        match self.try_start().await {
            Ok(record) => Ok(record),
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Reserve a session in one compare-and-set: the store checks the
    /// document is idle and stamps both timestamps from its own clock.
    pub async fn try_start(&self) -> Result<MiningRecord, MiningError> {
        let user_id = self.require_user()?;
        let settings = self.settings();
        settings.validate()?;
        let mining = settings.mining;

        let current = self
            .guard(self.store.get(user_id))
            .await
            .map_err(|e| MiningError::SessionStartFailed(e.to_string()))?;
        if let Some(doc) = &current {
            if !classify(&doc.mining_record(), self.now()).is_idle() {
                return Err(MiningError::AlreadyActive);
            }
        }

        let mut busy = false;
        let mut out_of_range = false;
        let commit = self
            .guard(self.store.atomic_update(user_id, |doc, server_now| {
                let doc = doc?;
                if !classify(&doc.mining_record(), server_now).is_idle() {
                    busy = true;
                    return None;
                }
                busy = false;
                let Some(record) = reserve(server_now, &mining) else {
                    out_of_range = true;
                    return None;
                };
                out_of_range = false;
                let mut next = doc.clone();
                next.set_mining_record(record);
                Some(next)
            }))
            .await
            .map_err(|e| {
                error!("start for {} failed: {}", user_id, e);
                MiningError::SessionStartFailed(e.to_string())
            })?;

        let record = match commit.snapshot {
            Some(doc) if commit.committed => doc.mining_record(),
            _ if busy => return Err(MiningError::AlreadyActive),
            _ if out_of_range => {
                return Err(MiningError::SessionStartFailed(format!(
                    "session of {} hours ends out of range",
                    mining.mining_duration
                )))
            }
            _ => {
                return Err(MiningError::SessionStartFailed(format!(
                    "no user document for {}",
                    user_id
                )))
            }
        };

        let (start, end) = match (record.mining_start_time, record.mining_end_time) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(MiningError::SessionStartFailed(
                    "store returned an incomplete session".into(),
                ))
            }
        };
        info!("{} started mining: {}..{}", user_id, start, end);

        self.start_updater((start, end), mining);
        self.ui.set_session_state(classify(&record, self.now()));
        self.ui.notify(
            &format!("Mining started for {} hours!", mining.mining_duration),
            Severity::Success,
        );
        self.events.send(&AnalyticsEvent::MiningStarted {
            user_id: user_id.to_string(),
            timestamp: start,
        });
        debug!("live updater running: {}", self.is_ticking());

        Ok(record)
    }
}
