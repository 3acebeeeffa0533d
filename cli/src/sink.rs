use std::sync::Mutex;

use farm_api::prelude::*;
use farm_client::{ClaimHooks, EventSink, Severity, UiSink};
use ::log::debug;

use crate::log;

/// Renders controller feedback on the terminal. In live mode the countdown
/// is redrawn in place on every tick; otherwise only notifications print.
#[derive(Default)]
pub struct TerminalSink {
    live: bool,
    remaining: Mutex<String>,
}

impl TerminalSink {
    pub fn live() -> Self {
        Self {
            live: true,
            remaining: Mutex::new(String::new()),
        }
    }
}

impl UiSink for TerminalSink {
    fn notify(&self, message: &str, severity: Severity) {
        if self.live {
            log::end_live();
        }
        match severity {
            Severity::Success => log::print_success(message),
            Severity::Info => log::print_message(message),
            Severity::Error => log::print_error(message),
        }
    }

    fn set_remaining_display(&self, text: &str) {
        let mut remaining = self.remaining.lock().unwrap_or_else(|e| e.into_inner());
        *remaining = text.to_string();
    }

    fn set_earned_display(&self, text: &str) {
        if !self.live {
            return;
        }
        let remaining = self.remaining.lock().unwrap_or_else(|e| e.into_inner());
        log::print_live(&format!("⏱  {}   ⛏  {}", remaining, text));
    }

    fn set_session_state(&self, state: SessionState) {
        debug!("session state: {}", state.label());
    }
}

impl ClaimHooks for TerminalSink {
    fn show_ad(&self) {
        debug!("interstitial ad slot (not shown in terminal)");
    }
}

impl EventSink for TerminalSink {
    fn send(&self, event: &AnalyticsEvent) {
        match serde_json::to_string(event) {
            Ok(json) => debug!("analytics: {}", json),
            Err(e) => debug!("analytics event not serializable: {}", e),
        }
    }
}
