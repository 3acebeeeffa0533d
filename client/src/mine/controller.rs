use std::future::Future;
use std::sync::Arc;

use farm_api::prelude::*;
use log::{debug, warn};
use tokio::sync::watch;
use tokio::time::Duration;

use super::updater::LiveUpdater;
use crate::clock::Clock;
use crate::hooks::{ClaimHooks, EventSink, Noop, Severity, UiSink};
use crate::store::{StoreError, UserStore};
use crate::utils::{with_timeout, TIMEOUT};

/// Drives one user's mining session: start, live display, claim, teardown.
///
/// The controller owns its live updater, so dropping it or calling
/// [`teardown`](Self::teardown) guarantees no timer outlives the view.
pub struct MiningController<S: UserStore, C: Clock> {
    pub(super) store: Arc<S>,
    pub(super) clock: Arc<C>,
    pub(super) settings: watch::Receiver<AppSettings>,
    pub(super) ui: Arc<dyn UiSink>,
    pub(super) hooks: Arc<dyn ClaimHooks>,
    pub(super) events: Arc<dyn EventSink>,
    pub(super) user_id: Option<String>,
    pub(super) updater: LiveUpdater,
    pub(super) timeout: Duration,
}

impl<S: UserStore, C: Clock> MiningController<S, C> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<C>,
        settings: watch::Receiver<AppSettings>,
        ui: Arc<dyn UiSink>,
    ) -> Self {
        Self {
            store,
            clock,
            settings,
            ui,
            hooks: Arc::new(Noop),
            events: Arc::new(Noop),
            user_id: None,
            updater: LiveUpdater::new(),
            timeout: TIMEOUT,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ClaimHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Bound on each store round trip.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sign_in(&mut self, user_id: impl Into<String>) {
        self.teardown();
        self.user_id = Some(user_id.into());
    }

    pub fn sign_out(&mut self) {
        self.teardown();
        self.user_id = None;
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Settings in force right now; read at the start of every operation.
    pub fn settings(&self) -> AppSettings {
        *self.settings.borrow()
    }

    pub fn is_ticking(&self) -> bool {
        self.updater.is_running()
    }

    /// Current user document, if signed in and present.
    pub async fn snapshot(&self) -> Result<Option<UserDocument>, StoreError> {
        let Some(user_id) = self.user_id.as_deref() else {
            return Ok(None);
        };
        self.guard(self.store.get(user_id)).await
    }

    /// Re-enter the mining view: publish the classified state and resume the
    /// live updater when a session is running or waiting to be claimed.
    pub async fn resume(&self) -> Result<SessionState, StoreError> {
        let doc = self.snapshot().await?;
        let settings = self.settings().mining;
        let record = doc.map(|d| d.mining_record()).unwrap_or_default();
        let state = classify(&record, self.now());
        debug!("resume: {:?}", state);

        self.ui.set_session_state(state);
        match state {
            SessionState::Idle => {
                self.updater.stop();
                self.ui.set_remaining_display(START_LABEL);
            }
            SessionState::Active { start, end } => {
                self.start_updater((start, end), settings);
            }
            SessionState::Claimable { start, end } => {
                self.updater.stop();
                self.ui.set_remaining_display(CLAIM_LABEL);
                self.ui
                    .set_earned_display(&format_earned(earned(&record, &settings, self.now())));
                debug!("session {}..{} ready to claim", start, end);
            }
        }
        Ok(state)
    }

    /// Cancel the live updater. Call on sign-out, navigation, or unmount.
    pub fn teardown(&self) {
        self.updater.stop();
    }

    pub(super) fn start_updater(&self, window: (i64, i64), settings: MiningSettings) {
        self.updater.start(
            window,
            settings,
            Arc::clone(&self.clock),
            Arc::clone(&self.ui),
        );
    }

    pub(super) fn require_user(&self) -> Result<&str, MiningError> {
        self.user_id.as_deref().ok_or(MiningError::NotAuthenticated)
    }

    pub(super) async fn guard<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        with_timeout(self.timeout, fut).await
    }

    /// Surface an operation failure to the user.
    pub(super) fn report(&self, err: &MiningError) {
        let (message, severity) = match err {
            MiningError::NotAuthenticated => ("Login required.", Severity::Error),
            MiningError::AlreadyActive => ("Mining already active.", Severity::Error),
            MiningError::SessionStartFailed(_) => ("Failed to start mining.", Severity::Error),
            MiningError::ClaimNotReady(_) => ("Not ready to claim yet.", Severity::Info),
            MiningError::ClaimTransportFailure(_) => ("Claim failed.", Severity::Error),
            MiningError::InvalidSettings(_) => ("Mining is misconfigured.", Severity::Error),
            // Never surfaced; the credit already stands.
            MiningError::TransactionLogWriteFailure(_) => {
                warn!("{}", err);
                return;
            }
        };
        debug!("reporting: {}", err);
        self.ui.notify(message, severity);
    }
}
