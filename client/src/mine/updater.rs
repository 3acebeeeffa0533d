use std::sync::{Arc, Mutex, MutexGuard};

use farm_api::prelude::*;
use log::debug;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};

use crate::clock::Clock;
use crate::hooks::{Severity, UiSink};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

struct Running {
    handle: JoinHandle<()>,
    // Cleared under lock by `stop`; a tick only publishes while it is set.
    live: Arc<Mutex<bool>>,
}

/// The once-per-second countdown and earned-amount display. At most one
/// ticker runs per updater; starting again replaces the previous one.
#[derive(Default)]
pub struct LiveUpdater {
    running: Mutex<Option<Running>>,
}

impl LiveUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking for the session `window` (start, end). Must be called
    /// from within a tokio runtime.
    pub fn start<C: Clock>(
        &self,
        window: (i64, i64),
        settings: MiningSettings,
        clock: Arc<C>,
        ui: Arc<dyn UiSink>,
    ) {
        let mut running = self.lock();
        if let Some(previous) = running.take() {
            cancel(previous);
        }

        let live = Arc::new(Mutex::new(true));
        let ticket = Arc::clone(&live);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tick_if_live(&ticket, window, &settings, clock.now_ms(), ui.as_ref()) {
                    break;
                }
            }
            debug!("live updater for session ending {} stopped", window.1);
        });

        *running = Some(Running { handle, live });
    }

    /// Cancel the ticker. Safe to call repeatedly.
    pub fn stop(&self) {
        if let Some(running) = self.lock().take() {
            cancel(running);
            debug!("live updater cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for LiveUpdater {
    fn drop(&mut self) {
        self.stop();
    }
}

fn cancel(running: Running) {
    *running.live.lock().unwrap_or_else(|e| e.into_inner()) = false;
    running.handle.abort();
}

fn tick_if_live(
    live: &Mutex<bool>,
    window: (i64, i64),
    settings: &MiningSettings,
    now: i64,
    ui: &dyn UiSink,
) -> bool {
    let live = live.lock().unwrap_or_else(|e| e.into_inner());
    if !*live {
        return true;
    }
    tick(window, settings, now, ui)
}

/// Publish one countdown frame. Returns true once the session has matured.
pub fn tick(window: (i64, i64), settings: &MiningSettings, now: i64, ui: &dyn UiSink) -> bool {
    let (start, end) = window;
    let left = remaining_seconds(end, now);
    let amount = earned(&MiningRecord::new(start, end), settings, now);

    ui.set_remaining_display(&format_remaining(left));
    ui.set_earned_display(&format_earned(amount));

    if left > 0 {
        return false;
    }

    ui.set_session_state(SessionState::Claimable { start, end });
    ui.notify(
        &format!("Mining complete! Claim {} {}.", settings.total_reward, TICKER),
        Severity::Success,
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::hooks::recording::{Recorder, UiCall};

    const T: i64 = 1_700_000_000_000;

    fn settings() -> MiningSettings {
        MiningSettings::default()
    }

    #[test]
    fn test_tick_frames() {
        let ui = Recorder::default();
        let window = (T, T + settings().duration_ms());

        assert!(!tick(window, &settings(), T + 14_400_000, &ui));
        assert_eq!(
            ui.calls(),
            vec![
                UiCall::Remaining("04:00:00".into()),
                UiCall::Earned("3.000000 FZ".into()),
            ]
        );

        assert!(tick(window, &settings(), window.1, &ui));
        assert!(ui.calls().contains(&UiCall::Remaining("Claim".into())));
        assert!(ui.calls().contains(&UiCall::State(SessionState::Claimable {
            start: window.0,
            end: window.1
        })));
        assert_eq!(
            ui.notifications(),
            vec![("Mining complete! Claim 6 FZ.".to_string(), Severity::Success)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_once() {
        let clock = Arc::new(ManualClock::new(T));
        let ui = Arc::new(Recorder::default());
        let updater = LiveUpdater::new();

        updater.start((T - 60_000, T + 2_500), settings(), clock.clone(), ui.clone());
        for _ in 0..6 {
            tokio::time::sleep(TICK_INTERVAL).await;
            clock.advance(1_000);
        }

        assert!(!updater.is_running());
        assert_eq!(
            ui.count(|c| matches!(c, UiCall::Notify(m, _) if m.starts_with("Mining complete"))),
            1
        );
        assert_eq!(ui.count(|c| matches!(c, UiCall::State(_))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_ticker() {
        let clock = Arc::new(ManualClock::new(T));
        let ui = Arc::new(Recorder::default());
        let updater = LiveUpdater::new();

        updater.start((T, T + 50_000), settings(), clock.clone(), ui.clone());
        tokio::time::sleep(TICK_INTERVAL / 2).await;
        updater.start((T, T + 100_000), settings(), clock.clone(), ui.clone());
        let before = ui.len();

        tokio::time::sleep(TICK_INTERVAL * 3).await;
        let frames: Vec<String> = ui.calls()[before..]
            .iter()
            .filter_map(|c| match c {
                UiCall::Remaining(text) => Some(text.clone()),
                _ => None,
            })
            .collect();

        assert!(!frames.is_empty());
        assert!(frames.iter().all(|f| f == "00:01:40"), "{:?}", frames);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_silences_ticks() {
        let clock = Arc::new(ManualClock::new(T));
        let ui = Arc::new(Recorder::default());
        let updater = LiveUpdater::new();

        updater.start((T, T + 5_000), settings(), clock.clone(), ui.clone());
        tokio::time::sleep(TICK_INTERVAL * 2).await;
        assert!(updater.is_running());

        updater.stop();
        updater.stop();
        let frozen = ui.len();

        // Past maturity: a live ticker would now publish and notify.
        clock.advance(60_000);
        tokio::time::sleep(TICK_INTERVAL * 5).await;

        assert_eq!(ui.len(), frozen);
        assert!(ui.notifications().is_empty());
        assert!(!updater.is_running());
    }
}
