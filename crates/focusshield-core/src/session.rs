//! Session value types.
//!
//! A [`SessionRecord`] is created the moment a session starts
//! (status `InProgress`, no end time) and finalized exactly once, by
//! natural expiry or an explicit user stop. Finalized records are
//! append-only history: nothing in this crate mutates one afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which interval a session covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionKind {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn is_focus(self) -> bool {
        self == SessionKind::Focus
    }

    pub fn is_break(self) -> bool {
        !self.is_focus()
    }

    /// Human-readable label, as shown on the lock-screen surface.
    pub fn label(self) -> &'static str {
        match self {
            SessionKind::Focus => "Focus",
            SessionKind::ShortBreak => "Short Break",
            SessionKind::LongBreak => "Long Break",
        }
    }
}

/// Terminal and non-terminal session outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Failed,
}

/// One focus or break session, as persisted in history.
///
/// Invariant: `ended_at.is_none()` exactly when `status == InProgress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub kind: SessionKind,
    /// Planned length in seconds, fixed at start.
    pub planned_secs: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
}

impl SessionRecord {
    /// Open a new in-progress record.
    pub fn begin(kind: SessionKind, planned_secs: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            planned_secs,
            started_at,
            ended_at: None,
            status: SessionStatus::InProgress,
        }
    }

    /// Stamp the terminal status and end time. Called at most once per record.
    pub fn finalize(mut self, status: SessionStatus, ended_at: DateTime<Utc>) -> Self {
        debug_assert!(status != SessionStatus::InProgress);
        debug_assert!(self.ended_at.is_none());
        self.status = status;
        self.ended_at = Some(ended_at);
        self
    }

    pub fn is_finalized(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Wall-clock seconds the session actually ran. Zero while in progress.
    pub fn actual_secs(&self) -> u64 {
        match self.ended_at {
            Some(end) => (end - self.started_at).num_seconds().max(0) as u64,
            None => 0,
        }
    }
}
