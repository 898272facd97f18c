//! Completion-alert contract.
//!
//! Local notifications are an external collaborator: the core asks for
//! one alert per natural session completion and never checks whether it
//! fired. User-initiated stops do not alert.

use crate::session::SessionKind;

pub trait AlertScheduler: Send + Sync {
    /// Fire-and-forget: schedule the "session over" alert for a session
    /// of `kind` that just completed.
    fn schedule_completion_alert(&self, kind: SessionKind);
}

/// Scheduler for platforms without local notifications.
#[derive(Debug, Default)]
pub struct NullScheduler;

impl AlertScheduler for NullScheduler {
    fn schedule_completion_alert(&self, _kind: SessionKind) {}
}
