use farm_api::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Error,
}

/// Where the mining core publishes user-visible feedback.
pub trait UiSink: Send + Sync + 'static {
    fn notify(&self, message: &str, severity: Severity);
    fn set_remaining_display(&self, text: &str);
    fn set_earned_display(&self, text: &str);
    /// Mining button / status transition.
    fn set_session_state(&self, state: SessionState);
}

/// Side effects run after a committed claim.
pub trait ClaimHooks: Send + Sync + 'static {
    fn show_ad(&self);
}

/// Analytics forwarding to the host platform.
pub trait EventSink: Send + Sync + 'static {
    fn send(&self, event: &AnalyticsEvent);
}

/// Hooks and sinks that do nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct Noop;

impl ClaimHooks for Noop {
    fn show_ad(&self) {}
}

impl EventSink for Noop {
    fn send(&self, _event: &AnalyticsEvent) {}
}

impl UiSink for Noop {
    fn notify(&self, _message: &str, _severity: Severity) {}
    fn set_remaining_display(&self, _text: &str) {}
    fn set_earned_display(&self, _text: &str) {}
    fn set_session_state(&self, _state: SessionState) {}
}
