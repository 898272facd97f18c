//! Live-state snapshot publishing.
//!
//! The lock-screen surface (live activity / dynamic island widget) is a
//! push-only display sink: the core hands it render-ready state and
//! never reads anything back. The surface derives its own `MM:SS` text
//! and progress fraction from `remaining_secs` / `total_secs`; the core
//! deliberately does not push a precomputed progress value.

use serde::{Deserialize, Serialize};

use crate::session::SessionKind;

/// Point-in-time projection of the running timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSnapshot {
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub kind: SessionKind,
}

/// Display sink for live snapshots. Fire-and-forget: implementations
/// must not fail loudly, and the timer never waits on them.
pub trait SnapshotSink: Send + Sync {
    fn publish(&self, snapshot: &LiveSnapshot);
}

/// Sink for platforms without a live-activity surface.
#[derive(Debug, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn publish(&self, _snapshot: &LiveSnapshot) {}
}
